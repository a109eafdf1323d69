//! Type-state builder for `DrawExecutor`.
//!
//! `build()` only exists once both a valve and a flow sensor are set.
//! `try_build()` is available in every state and reports what is missing.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use drawctl_traits::{Clock, FlowSensor, MonotonicClock, Valve};

use crate::config::DrawCfg;
use crate::error::{BuildError, Result};
use crate::executor::DrawExecutor;
use crate::flow::FlowIntegrator;

pub struct Missing;
pub struct Set;

type BoxedValve = Box<dyn Valve + Send>;
type BoxedSensor = Box<dyn FlowSensor + Send>;

pub struct ExecutorBuilder<V, F> {
    valve: Option<BoxedValve>,
    sensor: Option<BoxedSensor>,
    draw: Option<DrawCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _v: PhantomData<V>,
    _f: PhantomData<F>,
}

impl Default for ExecutorBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            valve: None,
            sensor: None,
            draw: None,
            clock: None,
            _v: PhantomData,
            _f: PhantomData,
        }
    }
}

impl DrawExecutor {
    /// Start building an executor.
    pub fn builder() -> ExecutorBuilder<Missing, Missing> {
        ExecutorBuilder::default()
    }
}

fn validate(draw: &DrawCfg) -> core::result::Result<(), BuildError> {
    if draw.timeout == Duration::ZERO {
        return Err(BuildError::InvalidConfig("draw timeout must be > 0"));
    }
    if FlowIntegrator::new(draw.integrator.pulses_per_unit()).is_none() {
        return Err(BuildError::InvalidConfig(
            "pulses_per_unit must be finite and > 0",
        ));
    }
    Ok(())
}

impl<V, F> ExecutorBuilder<V, F> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<DrawExecutor> {
        let valve = self
            .valve
            .ok_or_else(|| eyre::Report::new(BuildError::MissingValve))?;
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingFlowSensor))?;
        let draw = self.draw.unwrap_or_default();
        validate(&draw).map_err(eyre::Report::new)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        DrawExecutor::spawn(valve, sensor, draw, clock)
    }

    pub fn with_draw(mut self, draw: DrawCfg) -> Self {
        self.draw = Some(draw);
        self
    }

    /// Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl<F> ExecutorBuilder<Missing, F> {
    pub fn with_valve(self, valve: impl Valve + Send + 'static) -> ExecutorBuilder<Set, F> {
        ExecutorBuilder {
            valve: Some(Box::new(valve)),
            sensor: self.sensor,
            draw: self.draw,
            clock: self.clock,
            _v: PhantomData,
            _f: PhantomData,
        }
    }
}

impl<V> ExecutorBuilder<V, Missing> {
    pub fn with_flow_sensor(
        self,
        sensor: impl FlowSensor + Send + 'static,
    ) -> ExecutorBuilder<V, Set> {
        ExecutorBuilder {
            valve: self.valve,
            sensor: Some(Box::new(sensor)),
            draw: self.draw,
            clock: self.clock,
            _v: PhantomData,
            _f: PhantomData,
        }
    }
}

impl ExecutorBuilder<Set, Set> {
    /// Validate and spawn the worker.
    pub fn build(self) -> Result<DrawExecutor> {
        self.try_build()
    }
}
