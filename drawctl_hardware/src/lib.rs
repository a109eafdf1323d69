pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

use drawctl_traits::{Clock, FlowSensor, Valve};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Water flowing through the simulated rig. Shared by the valve (which gates
/// it) and the meter (which turns open time into edges).
#[derive(Debug, Default)]
struct SimFlow {
    open_since: Option<Instant>,
    /// Microseconds the valve was open before the current opening.
    open_us_before: u128,
    /// Edges already handed out by `take_edges`.
    reported: u64,
    open_count: u32,
}

#[derive(Clone)]
struct SharedFlow {
    state: Arc<Mutex<SimFlow>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SharedFlow {
    fn lock(&self) -> MutexGuard<'_, SimFlow> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Simulated valve; only tracks whether water is flowing. Clones observe
/// the same line.
#[derive(Clone)]
pub struct SimulatedValve {
    flow: SharedFlow,
}

impl SimulatedValve {
    pub fn is_open(&self) -> bool {
        self.flow.lock().open_since.is_some()
    }

    /// Number of times the valve has been opened.
    pub fn open_count(&self) -> u32 {
        self.flow.lock().open_count
    }
}

impl Valve for SimulatedValve {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let now = self.flow.clock.now();
        let mut st = self.flow.lock();
        if st.open_since.is_none() {
            st.open_since = Some(now);
            st.open_count = st.open_count.saturating_add(1);
            tracing::trace!("valve opened (simulated)");
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let now = self.flow.clock.now();
        let mut st = self.flow.lock();
        if let Some(since) = st.open_since.take() {
            st.open_us_before += now.saturating_duration_since(since).as_micros();
            tracing::trace!("valve closed (simulated)");
        }
        Ok(())
    }
}

/// Simulated flow meter emitting a constant pulse rate while the valve is open.
pub struct SimulatedFlowMeter {
    flow: SharedFlow,
    pulses_per_sec: f64,
}

impl SimulatedFlowMeter {
    pub fn pulses_per_sec(&self) -> f64 {
        self.pulses_per_sec
    }
}

impl FlowSensor for SimulatedFlowMeter {
    fn take_edges(&mut self) -> Result<u32, Box<dyn std::error::Error + Send + Sync>> {
        let now = self.flow.clock.now();
        let mut st = self.flow.lock();
        let mut open_us = st.open_us_before;
        if let Some(since) = st.open_since {
            open_us += now.saturating_duration_since(since).as_micros();
        }
        let total = (self.pulses_per_sec * open_us as f64 / 1_000_000.0).floor() as u64;
        let fresh = total.saturating_sub(st.reported);
        st.reported = total;
        Ok(u32::try_from(fresh).unwrap_or(u32::MAX))
    }
}

/// Build a simulated valve and flow meter that share one water line.
///
/// Negative or non-finite rates are treated as a dry line (no pulses).
pub fn simulated_rig(
    pulses_per_sec: f64,
    clock: Arc<dyn Clock + Send + Sync>,
) -> (SimulatedValve, SimulatedFlowMeter) {
    let rate = if pulses_per_sec.is_finite() && pulses_per_sec > 0.0 {
        pulses_per_sec
    } else {
        0.0
    };
    let flow = SharedFlow {
        state: Arc::new(Mutex::new(SimFlow::default())),
        clock,
    };
    (
        SimulatedValve { flow: flow.clone() },
        SimulatedFlowMeter {
            flow,
            pulses_per_sec: rate,
        },
    )
}
