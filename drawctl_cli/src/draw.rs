//! Command bodies: rig assembly, dispatch, manual draws, schedule tools.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use drawctl_config::Config;
use drawctl_core::error::{DrawError, Result};
use drawctl_core::{
    DailyLog, DispatchLoop, DrawCfg, DrawExecutor, DrawRequest, LogRecord,
    ScheduleTable,
};
use drawctl_traits::{Clock, FlowSensor, MonotonicClock, SystemWallClock, Valve, WallClock};
use eyre::WrapErr;
use serde_json::json;

pub type BoxedValve = Box<dyn Valve + Send>;
pub type BoxedSensor = Box<dyn FlowSensor + Send>;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub const BACKEND: &str = "gpio";
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub const BACKEND: &str = "sim";

pub fn config_error(msg: impl Into<String>) -> eyre::Report {
    eyre::Report::new(DrawError::Config(msg.into()))
}

/// Open the valve and flow meter for this build: GPIO with the `hardware`
/// feature on Linux, otherwise the simulated rig at `[sim] pulses_per_sec`.
pub fn open_rig(cfg: &Config, clock: Arc<dyn Clock + Send + Sync>) -> Result<(BoxedValve, BoxedSensor)> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let _ = clock;
        let (valve, meter) = drawctl_hardware::gpio::open_rig(
            cfg.pins.valve_out,
            cfg.pins.flow_in,
            cfg.pins.flow_pull_up,
        )
        .map_err(|e| eyre::Report::new(drawctl_core::hw_error::map_hw_error(&e)))
        .wrap_err("open valve/flow meter pins")?;
        tracing::info!(
            valve_out = cfg.pins.valve_out,
            flow_in = cfg.pins.flow_in,
            "GPIO rig ready"
        );
        Ok((Box::new(valve), Box::new(meter)))
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let (valve, meter) = drawctl_hardware::simulated_rig(cfg.sim.pulses_per_sec, clock);
        tracing::info!(pulses_per_sec = meter.pulses_per_sec(), "simulated rig ready");
        Ok((Box::new(valve), Box::new(meter)))
    }
}

pub fn build_executor(cfg: &Config, clock: Arc<dyn Clock + Send + Sync>) -> Result<DrawExecutor> {
    let draw = DrawCfg::try_from(cfg).map_err(eyre::Report::new)?;
    let (valve, meter) = open_rig(cfg, clock.clone())?;
    DrawExecutor::builder()
        .with_valve(valve)
        .with_flow_sensor(meter)
        .with_draw(draw)
        .with_clock(clock)
        .build()
}

fn schedule_path(cfg: &Config, cli: Option<PathBuf>) -> Result<PathBuf> {
    cli.or_else(|| cfg.dispatch.schedule.clone()).ok_or_else(|| {
        config_error("no schedule given: pass --schedule or set [dispatch] schedule")
    })
}

fn load_table(path: &Path) -> Result<ScheduleTable> {
    let entries = drawctl_config::load_schedule_csv(path).map_err(|e| config_error(format!("{e:#}")))?;
    let table = ScheduleTable::from(entries);
    tracing::info!(path = %path.display(), entries = table.len(), "schedule loaded");
    Ok(table)
}

pub fn run_schedule(
    cfg: &Config,
    wall: SystemWallClock,
    schedule: Option<PathBuf>,
    ticks: Option<u64>,
    shutdown: Arc<AtomicBool>,
    json: bool,
) -> Result<()> {
    let table = load_table(&schedule_path(cfg, schedule)?)?;
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let executor = build_executor(cfg, clock.clone())?;
    let mut dispatch = DispatchLoop::new(
        table,
        executor,
        DailyLog::new((&cfg.daily_log).into()),
        Arc::new(wall),
        clock,
        (&cfg.dispatch).into(),
    )
    .with_shutdown(shutdown);

    let stats = dispatch.run(ticks)?;
    tracing::info!(
        ticks = stats.ticks,
        draws = stats.draws,
        log_failures = stats.log_failures,
        "dispatch loop stopped"
    );
    if json {
        println!(
            "{}",
            json!({
                "ticks": stats.ticks,
                "draws": stats.draws,
                "log_failures": stats.log_failures,
            })
        );
    } else {
        println!(
            "stopped after {} ticks: {} draws, {} log failures",
            stats.ticks, stats.draws, stats.log_failures
        );
    }
    Ok(())
}

pub fn run_draw(cfg: &Config, wall: SystemWallClock, volume: f64, json: bool) -> Result<()> {
    if !volume.is_finite() {
        return Err(config_error("--volume must be a finite number"));
    }
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let executor = build_executor(cfg, clock)?;
    let req = DrawRequest::new(volume);
    let started = wall.now_local();
    let result = executor.submit(req).wrap_err("manual draw")?;

    let logged = if req.is_noop() {
        false
    } else {
        let time_of_day = started.time().replace_nanosecond(0).unwrap_or(started.time());
        let mut log = DailyLog::new((&cfg.daily_log).into());
        match log.append(started.date(), &LogRecord::from_result(time_of_day, &result)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "failed to write daily log row");
                false
            }
        }
    };

    if json {
        println!(
            "{}",
            json!({
                "volume": result.volume,
                "duration_s": result.duration_seconds,
                "timed_out": result.timed_out,
                "pulses": result.pulses,
                "unit": cfg.flow.unit,
                "logged": logged,
            })
        );
    } else if result.timed_out {
        println!(
            "draw timed out: {:.2} {} in {:.2} s",
            result.volume, cfg.flow.unit, result.duration_seconds
        );
    } else {
        println!(
            "draw complete: {:.2} {} in {:.2} s",
            result.volume, cfg.flow.unit, result.duration_seconds
        );
    }
    Ok(())
}

pub fn check_schedule(cfg: &Config, schedule: Option<PathBuf>, json: bool) -> Result<()> {
    let path = schedule_path(cfg, schedule)?;
    let table = load_table(&path)?;
    let s = table.summary();
    let first = s.first.map(drawctl_config::format_time_of_day);
    let last = s.last.map(drawctl_config::format_time_of_day);
    if json {
        println!(
            "{}",
            json!({
                "path": path.display().to_string(),
                "entries": s.entries,
                "distinct_times": s.distinct_times,
                "total_volume": s.total_volume,
                "first": first,
                "last": last,
            })
        );
    } else {
        println!("schedule {}", path.display());
        println!("  entries:        {}", s.entries);
        println!("  distinct times: {}", s.distinct_times);
        println!("  total volume:   {:.2} {}", s.total_volume, cfg.flow.unit);
        if let (Some(first), Some(last)) = (first, last) {
            println!("  first / last:   {first} / {last}");
        }
    }
    Ok(())
}

pub fn expand_plan(
    cfg: &Config,
    plan: &Path,
    out: &Path,
    interval_min: Option<u32>,
    load_up_volume: Option<f64>,
    baseline_volume: Option<f64>,
    json: bool,
) -> Result<()> {
    let mut ecfg = cfg.expand.clone();
    if let Some(m) = interval_min {
        ecfg.interval_min = m;
    }
    if let Some(v) = load_up_volume {
        ecfg.load_up_volume = v;
    }
    if let Some(v) = baseline_volume {
        ecfg.baseline_volume = v;
    }

    let plan = drawctl_config::load_period_plan_csv(plan).map_err(|e| config_error(format!("{e:#}")))?;
    let entries = plan
        .expand(&ecfg)
        .map_err(|e| config_error(format!("{e:#}")))?;
    drawctl_config::write_schedule_csv(out, &entries)
        .map_err(|e| eyre::Report::new(DrawError::Io(format!("{e:#}"))))?;
    tracing::info!(
        periods = plan.periods().len(),
        entries = entries.len(),
        out = %out.display(),
        "plan expanded"
    );
    if json {
        println!(
            "{}",
            json!({ "periods": plan.periods().len(), "entries": entries.len(), "out": out.display().to_string() })
        );
    } else {
        println!(
            "wrote {} entries from {} periods to {}",
            entries.len(),
            plan.periods().len(),
            out.display()
        );
    }
    Ok(())
}

pub fn self_check(cfg: &Config, json: bool) -> Result<()> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let (mut valve, mut meter) = open_rig(cfg, clock)?;
    valve
        .close()
        .map_err(|e| eyre::Report::new(drawctl_core::hw_error::map_hw_error(&*e)))
        .wrap_err("drive valve closed")?;
    let stale = meter
        .take_edges()
        .map_err(|e| eyre::Report::new(drawctl_core::hw_error::map_hw_error(&*e)))
        .wrap_err("poll flow meter")?;
    if json {
        println!("{}", json!({ "status": "ok", "backend": BACKEND, "stale_edges": stale }));
    } else {
        println!("OK ({BACKEND} backend, valve closed, {stale} stale edges)");
    }
    Ok(())
}
