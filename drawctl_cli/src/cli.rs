//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "drawctl",
    version,
    about = "Scheduled water-heater draw controller"
)]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/drawctl.toml")]
    pub config: PathBuf,

    /// Log and print results as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG takes precedence
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the schedule dispatch loop until Ctrl-C
    Run {
        /// Schedule CSV (time,volume); defaults to [dispatch] schedule
        #[arg(long, value_name = "FILE")]
        schedule: Option<PathBuf>,
        /// Stop after this many ticks
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
    },
    /// Draw a volume now and append it to today's log
    Draw {
        /// Target volume in the configured unit
        #[arg(long)]
        volume: f64,
    },
    /// Load a schedule CSV and print a summary
    CheckSchedule {
        /// Schedule CSV; defaults to [dispatch] schedule
        #[arg(long, value_name = "FILE")]
        schedule: Option<PathBuf>,
    },
    /// Expand a load-up/shed plan CSV into a schedule CSV
    Expand {
        /// Plan CSV with M_LU_time,...,E_S_duration columns
        #[arg(long, value_name = "FILE")]
        plan: PathBuf,
        /// Output schedule CSV
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
        /// Minutes between draws (overrides [expand] interval_min)
        #[arg(long, value_name = "MIN")]
        interval_min: Option<u32>,
        /// Volume per load-up draw (overrides [expand] load_up_volume)
        #[arg(long, value_name = "VOLUME")]
        load_up_volume: Option<f64>,
        /// Volume per baseline draw (overrides [expand] baseline_volume)
        #[arg(long, value_name = "VOLUME")]
        baseline_volume: Option<f64>,
    },
    /// Validate config, open the rig, and close the valve
    SelfCheck,
}
