//! Small numeric and time helpers shared across the core.

use std::time::Duration;

/// Round to two decimal places, the precision results are reported and logged at.
#[inline]
pub fn round_hundredths(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Duration in seconds rounded to hundredths.
#[inline]
pub fn secs_hundredths(d: Duration) -> f64 {
    round_hundredths(d.as_secs_f64())
}
