//! One draw: open the valve, count flow meter edges until the target volume
//! or the safety timeout is reached, close the valve.

use std::time::Instant;

use drawctl_traits::{Clock, FlowSensor, Valve};
use eyre::WrapErr;

use crate::config::DrawCfg;
use crate::error::{DrawError, Result};
use crate::hw_error::map_hw_error;
use crate::status::{DrawState, DrawStatus};
use crate::util::{round_hundredths, secs_hundredths};

/// A request to draw `target_volume` units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRequest {
    pub target_volume: f64,
}

impl DrawRequest {
    pub fn new(target_volume: f64) -> Self {
        Self { target_volume }
    }

    /// Non-positive (or NaN) targets never open the valve.
    pub fn is_noop(&self) -> bool {
        self.target_volume.is_nan() || self.target_volume <= 0.0
    }
}

/// Outcome of a finished draw. Volume and duration are rounded to hundredths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawResult {
    pub volume: f64,
    pub duration_seconds: f64,
    pub timed_out: bool,
    /// Raw edge count behind `volume`.
    pub pulses: u64,
}

impl DrawResult {
    /// Result of a request that never opened the valve.
    pub const NOOP: DrawResult = DrawResult {
        volume: 0.0,
        duration_seconds: 0.0,
        timed_out: false,
        pulses: 0,
    };
}

/// Scoped ownership of an open valve: if it is still armed when dropped
/// (early return, hardware error, panic), the valve is closed.
struct ValveGuard<'a, V: Valve + ?Sized> {
    valve: &'a mut V,
    armed: bool,
}

impl<'a, V: Valve + ?Sized> ValveGuard<'a, V> {
    fn new(valve: &'a mut V) -> Self {
        Self {
            valve,
            armed: false,
        }
    }

    fn open(&mut self) -> Result<()> {
        // Armed before the call: a failed open may still have driven the line.
        self.armed = true;
        self.valve
            .open()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("valve open")
    }

    fn close(&mut self) -> Result<()> {
        self.valve
            .close()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("valve close")?;
        self.armed = false;
        Ok(())
    }
}

impl<V: Valve + ?Sized> Drop for ValveGuard<'_, V> {
    fn drop(&mut self) {
        if self.armed {
            match self.valve.close() {
                Ok(()) => tracing::warn!("valve closed by guard after abnormal exit"),
                Err(e) => tracing::error!(error = %e, "valve close failed; valve may be open"),
            }
        }
    }
}

/// State machine for a single draw.
///
/// Drive it with `begin` then `step` until `DrawStatus::Completed`, or use
/// `run` which polls at `DrawCfg::poll_interval`.
pub struct DrawSession<'a, V: Valve + ?Sized, F: FlowSensor + ?Sized> {
    valve: ValveGuard<'a, V>,
    meter: &'a mut F,
    clock: &'a dyn Clock,
    cfg: DrawCfg,
    state: DrawState,
    target_volume: f64,
    pulses: u64,
    started_at: Option<Instant>,
}

impl<V: Valve + ?Sized, F: FlowSensor + ?Sized> core::fmt::Debug for DrawSession<'_, V, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DrawSession")
            .field("state", &self.state)
            .field("target_volume", &self.target_volume)
            .field("pulses", &self.pulses)
            .finish()
    }
}

impl<'a, V: Valve + ?Sized, F: FlowSensor + ?Sized> DrawSession<'a, V, F> {
    pub fn new(valve: &'a mut V, meter: &'a mut F, cfg: DrawCfg, clock: &'a dyn Clock) -> Self {
        Self {
            valve: ValveGuard::new(valve),
            meter,
            clock,
            cfg,
            state: DrawState::Idle,
            target_volume: 0.0,
            pulses: 0,
            started_at: None,
        }
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    /// Edges counted since the valve opened.
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    /// Volume drawn so far (unrounded).
    pub fn volume(&self) -> f64 {
        self.cfg.integrator.volume(self.pulses)
    }

    /// Open the valve and start measuring. A no-op request completes at once
    /// without touching the valve.
    pub fn begin(&mut self, req: DrawRequest) -> Result<DrawStatus> {
        if self.state != DrawState::Idle {
            return Err(eyre::Report::new(DrawError::State(format!(
                "begin called in state {:?}",
                self.state
            ))));
        }
        if req.is_noop() {
            tracing::debug!(target_volume = req.target_volume, "non-positive target; skipping draw");
            self.state = DrawState::Completed;
            return Ok(DrawStatus::Completed(DrawResult::NOOP));
        }

        self.state = DrawState::Opening;
        self.target_volume = req.target_volume;
        // Edges latched while the valve was closed belong to no draw.
        let stale = self.take_edges()?;
        if stale > 0 {
            tracing::debug!(stale, "discarded flow edges seen before opening");
        }
        self.pulses = 0;
        self.started_at = Some(self.clock.now());
        self.valve.open()?;
        self.state = DrawState::Measuring;
        tracing::info!(target_volume = req.target_volume, "draw start");
        Ok(DrawStatus::Measuring)
    }

    /// Poll the meter once and apply the exit conditions.
    pub fn step(&mut self) -> Result<DrawStatus> {
        if self.state != DrawState::Measuring {
            return Err(eyre::Report::new(DrawError::State(format!(
                "step called in state {:?}",
                self.state
            ))));
        }
        let edges = self.take_edges()?;
        self.pulses = self.pulses.saturating_add(u64::from(edges));
        if self.volume() >= self.target_volume {
            return self.finish(false).map(DrawStatus::Completed);
        }
        if self.elapsed() > self.cfg.timeout {
            tracing::warn!(
                target_volume = self.target_volume,
                volume = self.volume(),
                timeout_s = self.cfg.timeout.as_secs_f64(),
                "draw timed out before reaching target"
            );
            return self.finish(true).map(DrawStatus::Completed);
        }
        Ok(DrawStatus::Measuring)
    }

    /// Run a request to completion.
    pub fn run(mut self, req: DrawRequest) -> Result<DrawResult> {
        let mut status = self.begin(req)?;
        loop {
            match status {
                DrawStatus::Completed(result) => return Ok(result),
                DrawStatus::Measuring => {
                    self.clock.sleep(self.cfg.poll_interval);
                    status = self.step()?;
                }
            }
        }
    }

    fn elapsed(&self) -> std::time::Duration {
        self.started_at
            .map(|t| self.clock.now().saturating_duration_since(t))
            .unwrap_or_default()
    }

    fn take_edges(&mut self) -> Result<u32> {
        self.meter
            .take_edges()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("flow meter poll")
    }

    fn finish(&mut self, timed_out: bool) -> Result<DrawResult> {
        self.state = DrawState::Closing;
        self.valve.close()?;
        let result = DrawResult {
            volume: round_hundredths(self.volume()),
            duration_seconds: secs_hundredths(self.elapsed()),
            timed_out,
            pulses: self.pulses,
        };
        self.state = DrawState::Completed;
        tracing::info!(
            volume = result.volume,
            duration_s = result.duration_seconds,
            pulses = result.pulses,
            timed_out,
            "draw finished"
        );
        Ok(result)
    }
}
