#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Scheduled draw control (hardware-agnostic).
//!
//! All hardware interaction goes through `drawctl_traits::Valve` and
//! `drawctl_traits::FlowSensor`; time goes through `Clock` and `WallClock`.
//!
//! ## Architecture
//!
//! - **Flow**: pulse count to volume (`flow`)
//! - **Session**: one draw, open to close, with a timeout and a valve guard (`session`)
//! - **Executor**: single-slot worker that serializes draws (`executor`, `builder`)
//! - **Schedule**: exact-second time-of-day lookup, last entry wins (`schedule`)
//! - **Dispatch**: the 1 s control loop (`dispatch`)
//! - **Daily log**: one CSV per calendar day (`daily_log`)

pub mod builder;
pub mod config;
pub mod conversions;
pub mod daily_log;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod flow;
pub mod hw_error;
pub mod mocks;
pub mod schedule;
pub mod session;
pub mod status;
pub mod util;

pub use builder::{ExecutorBuilder, Missing, Set};
pub use config::{DailyLogCfg, DispatchCfg, DrawCfg};
pub use daily_log::{DailyLog, LogRecord};
pub use dispatch::{DispatchLoop, DispatchStats, TickOutcome};
pub use error::{BuildError, DrawError, Report, Result};
pub use executor::DrawExecutor;
pub use flow::FlowIntegrator;
pub use schedule::{ScheduleSummary, ScheduleTable};
pub use session::{DrawRequest, DrawResult, DrawSession};
pub use status::{DrawState, DrawStatus};
