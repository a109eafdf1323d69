#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema, schedule tables and load-up/shed plans for the draw rig.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `schedule` loads the `(time, volume)` table the dispatch loop matches against.
//! - `plan` reads the two-period load-up/shed plan and expands it into a schedule.
use serde::Deserialize;
use std::path::PathBuf;

pub mod plan;
pub mod schedule;

pub use plan::{ExpandCfg, GridMode, Period, PeriodKind, PeriodPlan, load_period_plan_csv};
pub use schedule::{
    ScheduleEntry, format_time_of_day, load_schedule_csv, parse_time_of_day, read_schedule,
    write_schedule_csv,
};

/// Reference calibration of the rig's flow meter.
pub const DEFAULT_PULSES_PER_UNIT: f64 = 476.0;
/// Reference per-draw safety bound.
pub const DEFAULT_DRAW_TIMEOUT_MS: u64 = 180_000;

#[derive(Debug, Deserialize)]
pub struct Pins {
    /// BCM pin driving the solenoid valve (high = open)
    pub valve_out: u8,
    /// BCM pin receiving flow meter pulses
    pub flow_in: u8,
    /// Enable the internal pull-up on the flow meter input
    #[serde(default = "default_true")]
    pub flow_pull_up: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Flow {
    /// Calibration constant: meter pulses per unit of volume
    pub pulses_per_unit: f64,
    /// Display label for the volume unit
    pub unit: String,
}

impl Default for Flow {
    fn default() -> Self {
        Self {
            pulses_per_unit: DEFAULT_PULSES_PER_UNIT,
            unit: "gallon".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Safety {
    /// Close the valve and report a timeout once a draw has run this long
    pub draw_timeout_ms: u64,
    /// Sleep between polls of the flow meter (0 = spin)
    pub poll_us: u64,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            draw_timeout_ms: DEFAULT_DRAW_TIMEOUT_MS,
            poll_us: 200,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Dispatch {
    /// Sleep between dispatch ticks
    pub tick_ms: u64,
    /// Default schedule CSV; the CLI flag takes precedence
    pub schedule: Option<PathBuf>,
}

impl Default for Dispatch {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            schedule: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DailyLog {
    /// Directory holding the per-day CSV files
    pub dir: PathBuf,
    /// File name prefix, followed by `M-D-YYYY.csv`
    pub prefix: String,
}

impl Default for DailyLog {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            prefix: "WH_Data_".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sim {
    /// Pulse rate of the simulated meter while the valve is open
    pub pulses_per_sec: f64,
}

impl Default for Sim {
    fn default() -> Self {
        Self {
            pulses_per_sec: 50.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub flow: Flow,
    #[serde(default)]
    pub safety: Safety,
    #[serde(default)]
    pub dispatch: Dispatch,
    #[serde(default)]
    pub daily_log: DailyLog,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: Sim,
    /// Defaults for `expand`
    #[serde(default)]
    pub expand: ExpandCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.valve_out == self.pins.flow_in {
            eyre::bail!("pins.valve_out and pins.flow_in must differ");
        }

        // Flow
        if !self.flow.pulses_per_unit.is_finite() || self.flow.pulses_per_unit <= 0.0 {
            eyre::bail!("flow.pulses_per_unit must be a finite value > 0");
        }

        // Safety
        if self.safety.draw_timeout_ms == 0 {
            eyre::bail!("safety.draw_timeout_ms must be >= 1");
        }
        if self.safety.draw_timeout_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("safety.draw_timeout_ms is unreasonably large (>24h)");
        }
        if self.safety.poll_us > 1_000_000 {
            eyre::bail!("safety.poll_us must be <= 1000000 (1s)");
        }

        // Dispatch
        if self.dispatch.tick_ms == 0 {
            eyre::bail!("dispatch.tick_ms must be >= 1");
        }

        // Daily log
        if self.daily_log.prefix.trim().is_empty() {
            eyre::bail!("daily_log.prefix must not be empty");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        // Sim
        if !self.sim.pulses_per_sec.is_finite() || self.sim.pulses_per_sec < 0.0 {
            eyre::bail!("sim.pulses_per_sec must be a finite value >= 0");
        }

        self.expand.validate()?;

        Ok(())
    }
}
