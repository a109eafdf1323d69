//! Maps `Box<dyn Error>` from trait boundaries to typed `DrawError`.
//!
//! The traits in `drawctl_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `drawctl_hardware::HwError`.

use crate::error::DrawError;

/// Map a trait-boundary error to a typed `DrawError`.
///
/// Every failure crossing the valve or flow meter boundary is a hardware
/// condition, including I/O on the GPIO device. Known `HwError`s become
/// `HardwareFault`; anything else is a generic `Hardware` error.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> DrawError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<drawctl_hardware::error::HwError>() {
            return DrawError::HardwareFault(hw.to_string());
        }
    }

    DrawError::Hardware(e.to_string())
}
