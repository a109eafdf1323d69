mod cli;
mod draw;
mod error_fmt;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use drawctl_config::Config;
use drawctl_traits::SystemWallClock;
use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::draw::config_error;
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    // `time` can only read the local UTC offset while the process is single
    // threaded; tracing-appender and ctrlc both spawn threads.
    let (wall, offset_known) = SystemWallClock::local();

    let _ = color_eyre::install();
    let cli = Cli::parse();
    let json = cli.json;
    let _ = JSON_MODE.set(json);

    if let Err(e) = real_main(cli, wall, offset_known) {
        tracing::debug!(error = ?e, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli, wall: SystemWallClock, offset_known: bool) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    if !offset_known {
        tracing::warn!("could not determine the local UTC offset; schedule times are matched in UTC");
    }

    match cli.cmd {
        Commands::Run { schedule, ticks } => {
            let shutdown = install_shutdown_handler()?;
            draw::run_schedule(&cfg, wall, schedule, ticks, shutdown, cli.json)
        }
        Commands::Draw { volume } => {
            // Ctrl-C during a draw is deferred until the valve is closed
            let _shutdown = install_shutdown_handler()?;
            draw::run_draw(&cfg, wall, volume, cli.json)
        }
        Commands::CheckSchedule { schedule } => draw::check_schedule(&cfg, schedule, cli.json),
        Commands::Expand {
            plan,
            out,
            interval_min,
            load_up_volume,
            baseline_volume,
        } => draw::expand_plan(
            &cfg,
            &plan,
            &out,
            interval_min,
            load_up_volume,
            baseline_volume,
            cli.json,
        ),
        Commands::SelfCheck => draw::self_check(&cfg, cli.json),
    }
}

fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| config_error(format!("read config {}: {e}", path.display())))?;
    let cfg = drawctl_config::load_toml(&text)
        .map_err(|e| config_error(format!("parse config {}: {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| config_error(format!("{e:#}")))
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?;
    Ok(cfg)
}

fn install_shutdown_handler() -> eyre::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    ctrlc::set_handler(move || {
        if !handler_flag.swap(true, Ordering::AcqRel) {
            tracing::warn!("Ctrl-C received; stopping after the current draw");
        }
    })
    .wrap_err("install Ctrl-C handler")?;
    Ok(flag)
}

/// Console output goes to stderr so stdout stays machine-readable.
fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &drawctl_config::Logging,
) -> eyre::Result<()> {
    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_json = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let console_pretty = (!json).then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| config_error(format!("logging.file {file:?} has no file name")))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_pretty)
        .with(file_layer)
        .try_init()
        .wrap_err("initialize logging")?;
    Ok(())
}
