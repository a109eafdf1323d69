//! Pulse-count to volume conversion.

/// Converts flow meter edges to volume with a fixed calibration constant.
///
/// volume = pulses / pulses_per_unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowIntegrator {
    pulses_per_unit: f64,
}

impl FlowIntegrator {
    /// Reference calibration: 476 pulses per gallon.
    pub const REFERENCE_PULSES_PER_UNIT: f64 = drawctl_config::DEFAULT_PULSES_PER_UNIT;

    /// Returns `None` unless `pulses_per_unit` is finite and positive.
    pub fn new(pulses_per_unit: f64) -> Option<Self> {
        (pulses_per_unit.is_finite() && pulses_per_unit > 0.0).then_some(Self { pulses_per_unit })
    }

    pub fn pulses_per_unit(&self) -> f64 {
        self.pulses_per_unit
    }

    #[inline]
    pub fn volume(&self, pulses: u64) -> f64 {
        pulses as f64 / self.pulses_per_unit
    }
}

impl Default for FlowIntegrator {
    fn default() -> Self {
        Self {
            pulses_per_unit: Self::REFERENCE_PULSES_PER_UNIT,
        }
    }
}
