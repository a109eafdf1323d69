//! `From` implementations bridging `drawctl_config` types to `drawctl_core` types.

use std::time::Duration;

use crate::config::{DailyLogCfg, DispatchCfg, DrawCfg};
use crate::error::DrawError;
use crate::flow::FlowIntegrator;
use crate::schedule::ScheduleTable;

// ── DrawCfg ──────────────────────────────────────────────────────────────────

impl TryFrom<&drawctl_config::Config> for DrawCfg {
    type Error = DrawError;

    fn try_from(c: &drawctl_config::Config) -> Result<Self, Self::Error> {
        let integrator = FlowIntegrator::new(c.flow.pulses_per_unit).ok_or_else(|| {
            DrawError::Config("flow.pulses_per_unit must be a finite value > 0".into())
        })?;
        Ok(Self {
            integrator,
            timeout: Duration::from_millis(c.safety.draw_timeout_ms),
            poll_interval: Duration::from_micros(c.safety.poll_us),
        })
    }
}

// ── DispatchCfg ──────────────────────────────────────────────────────────────

impl From<&drawctl_config::Dispatch> for DispatchCfg {
    fn from(c: &drawctl_config::Dispatch) -> Self {
        Self {
            tick: Duration::from_millis(c.tick_ms),
        }
    }
}

// ── DailyLogCfg ──────────────────────────────────────────────────────────────

impl From<&drawctl_config::DailyLog> for DailyLogCfg {
    fn from(c: &drawctl_config::DailyLog) -> Self {
        Self {
            dir: c.dir.clone(),
            prefix: c.prefix.clone(),
        }
    }
}

// ── ScheduleTable ────────────────────────────────────────────────────────────

impl From<Vec<drawctl_config::ScheduleEntry>> for ScheduleTable {
    fn from(entries: Vec<drawctl_config::ScheduleEntry>) -> Self {
        ScheduleTable::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_cfg_from_toml() {
        let cfg = drawctl_config::load_toml(
            "[pins]\nvalve_out = 17\nflow_in = 6\n[safety]\ndraw_timeout_ms = 5000\npoll_us = 0\n",
        )
        .unwrap();
        let draw = DrawCfg::try_from(&cfg).unwrap();
        assert_eq!(draw.timeout, Duration::from_secs(5));
        assert_eq!(draw.poll_interval, Duration::ZERO);
        assert_eq!(draw.integrator.pulses_per_unit(), 476.0);
    }

    #[test]
    fn unvalidated_zero_calibration_is_rejected() {
        let cfg = drawctl_config::load_toml(
            "[pins]\nvalve_out = 17\nflow_in = 6\n[flow]\npulses_per_unit = 0.0\n",
        )
        .unwrap();
        assert!(matches!(DrawCfg::try_from(&cfg), Err(DrawError::Config(_))));
    }
}
