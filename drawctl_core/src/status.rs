//! Draw session states and per-step status.

use crate::session::DrawResult;

/// Lifecycle of one draw. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawState {
    Idle,
    Opening,
    Measuring,
    Closing,
    Completed,
}

/// Result of a single measuring step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawStatus {
    /// Valve open, target not reached, timeout not exceeded.
    Measuring,
    /// Valve closed; the result is final.
    Completed(DrawResult),
}
