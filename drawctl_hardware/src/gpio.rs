//! Raspberry Pi GPIO backend: solenoid valve on an output pin, flow meter on
//! an input pin with a rising-edge interrupt.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use drawctl_traits::{FlowSensor, Valve};
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use tracing::{debug, trace, warn};

use crate::error::{HwError, Result};

/// Valve output. Driven low on construction and again on drop.
pub struct GpioValve {
    pin: OutputPin,
}

impl GpioValve {
    pub fn new(gpio: &Gpio, pin: u8) -> Result<Self> {
        let mut pin = gpio.get(pin)?.into_output_low();
        // Keep driving low after drop instead of falling back to a floating input.
        pin.set_reset_on_drop(false);
        Ok(Self { pin })
    }
}

impl Valve for GpioValve {
    fn open(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.pin.set_high();
        trace!(pin = self.pin.pin(), "valve high");
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.pin.set_low();
        trace!(pin = self.pin.pin(), "valve low");
        Ok(())
    }
}

impl Drop for GpioValve {
    fn drop(&mut self) {
        self.pin.set_low();
        debug!(pin = self.pin.pin(), "valve released low");
    }
}

/// Flow meter input. Rising edges are counted by rppal's interrupt thread and
/// drained by `take_edges`, so no edge is lost between polls.
pub struct GpioFlowMeter {
    pin: InputPin,
    edges: Arc<AtomicU32>,
}

impl GpioFlowMeter {
    pub fn new(gpio: &Gpio, pin: u8, pull_up: bool) -> Result<Self> {
        let raw = gpio.get(pin)?;
        let mut pin = if pull_up {
            raw.into_input_pullup()
        } else {
            raw.into_input()
        };
        let edges = Arc::new(AtomicU32::new(0));
        let counter = edges.clone();
        pin.set_async_interrupt(Trigger::RisingEdge, move |_level| {
            counter.fetch_add(1, Ordering::Relaxed);
        })?;
        Ok(Self { pin, edges })
    }
}

impl FlowSensor for GpioFlowMeter {
    fn take_edges(&mut self) -> std::result::Result<u32, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.edges.swap(0, Ordering::Relaxed))
    }
}

impl Drop for GpioFlowMeter {
    fn drop(&mut self) {
        if let Err(e) = self.pin.clear_async_interrupt() {
            warn!(error = %e, "failed to clear flow meter interrupt");
        }
    }
}

/// Open both rig pins from a single GPIO handle.
pub fn open_rig(valve_pin: u8, flow_pin: u8, flow_pull_up: bool) -> Result<(GpioValve, GpioFlowMeter)> {
    if valve_pin == flow_pin {
        return Err(HwError::PinConflict(valve_pin));
    }
    let gpio = Gpio::new()?;
    let valve = GpioValve::new(&gpio, valve_pin)?;
    let meter = GpioFlowMeter::new(&gpio, flow_pin, flow_pull_up)?;
    debug!(valve_pin, flow_pin, flow_pull_up, "gpio rig opened");
    Ok((valve, meter))
}
