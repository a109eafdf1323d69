//! Runtime configuration for draws and the dispatch loop.
//!
//! These are the structs the core runs on. They are separate from the
//! TOML-deserialized config in `drawctl_config`; see `conversions`.

use std::path::PathBuf;
use std::time::Duration;

use crate::flow::FlowIntegrator;

/// Per-draw parameters.
#[derive(Debug, Clone, Copy)]
pub struct DrawCfg {
    /// Pulse to volume conversion.
    pub integrator: FlowIntegrator,
    /// Safety bound; a draw still short of target after this long is closed
    /// and reported as timed out.
    pub timeout: Duration,
    /// Sleep between flow meter polls. Zero spins.
    pub poll_interval: Duration,
}

impl Default for DrawCfg {
    fn default() -> Self {
        Self {
            integrator: FlowIntegrator::default(),
            timeout: Duration::from_millis(drawctl_config::DEFAULT_DRAW_TIMEOUT_MS),
            poll_interval: Duration::from_micros(200),
        }
    }
}

/// Dispatch loop cadence.
#[derive(Debug, Clone, Copy)]
pub struct DispatchCfg {
    pub tick: Duration,
}

impl Default for DispatchCfg {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
        }
    }
}

/// Where daily CSV logs go.
#[derive(Debug, Clone)]
pub struct DailyLogCfg {
    pub dir: PathBuf,
    pub prefix: String,
}

impl Default for DailyLogCfg {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            prefix: "WH_Data_".to_string(),
        }
    }
}
