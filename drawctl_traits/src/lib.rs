pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock, ScriptedWallClock, SystemWallClock, WallClock};

/// Digital output driving the solenoid valve. High = open.
pub trait Valve {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Digital input fed by the flow meter.
///
/// `take_edges` returns the number of rising edges observed since the previous
/// call and resets that count. Implementations must latch every edge between
/// polls; a boolean "edge seen" flag would under-count at high flow.
pub trait FlowSensor {
    fn take_edges(&mut self) -> Result<u32, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Valve + ?Sized> Valve for Box<T> {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).open()
    }
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).close()
    }
}

impl<T: FlowSensor + ?Sized> FlowSensor for Box<T> {
    fn take_edges(&mut self) -> Result<u32, Box<dyn std::error::Error + Send + Sync>> {
        (**self).take_edges()
    }
}
