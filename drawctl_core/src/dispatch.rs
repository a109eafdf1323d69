//! Top-level control loop.
//!
//! Every tick: read the wall clock, make sure today's log file exists, look
//! the time of day up in the schedule, and on a match run the draw through
//! the executor (blocking) and append its row to today's log.
//!
//! Matching is by exact second. If a long draw or scheduling jitter makes the
//! loop skip past a scheduled second, that entry does not fire that day.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use drawctl_traits::{Clock, WallClock};
use eyre::WrapErr;

use crate::config::DispatchCfg;
use crate::daily_log::{DailyLog, LogRecord};
use crate::error::Result;
use crate::executor::DrawExecutor;
use crate::schedule::ScheduleTable;
use crate::session::{DrawRequest, DrawResult};

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No schedule entry (or a non-positive one) at this second.
    Idle,
    /// A draw ran. `logged` is false when the daily log row could not be written.
    Drew {
        record: LogRecord,
        result: DrawResult,
        logged: bool,
    },
}

/// Counters over a `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub ticks: u64,
    pub draws: u64,
    pub log_failures: u64,
}

/// Context object owning everything the loop touches.
pub struct DispatchLoop {
    table: ScheduleTable,
    executor: DrawExecutor,
    log: DailyLog,
    wall: Arc<dyn WallClock + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    cfg: DispatchCfg,
    shutdown: Arc<AtomicBool>,
    stats: DispatchStats,
}

impl core::fmt::Debug for DispatchLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispatchLoop")
            .field("entries", &self.table.len())
            .field("executor", &self.executor)
            .field("cfg", &self.cfg)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl DispatchLoop {
    pub fn new(
        table: ScheduleTable,
        executor: DrawExecutor,
        log: DailyLog,
        wall: Arc<dyn WallClock + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        cfg: DispatchCfg,
    ) -> Self {
        Self {
            table,
            executor,
            log,
            wall,
            clock,
            cfg,
            shutdown: Arc::new(AtomicBool::new(false)),
            stats: DispatchStats::default(),
        }
    }

    /// Use an externally owned shutdown flag (e.g. set from a signal handler).
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn executor(&self) -> &DrawExecutor {
        &self.executor
    }

    /// One loop iteration, without the trailing sleep.
    ///
    /// Log I/O failures are reported and swallowed. Draw failures (hardware)
    /// are returned.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let now = self.wall.now_local();
        let (date, time_of_day) = (now.date(), now.time());

        if let Err(e) = self.log.ensure_file(date) {
            tracing::warn!(error = %format!("{e:#}"), "daily log unavailable");
        }

        let req = DrawRequest::new(self.table.lookup(time_of_day));
        if req.is_noop() {
            tracing::trace!(time_of_day = %time_of_day, "no scheduled draw");
            return Ok(TickOutcome::Idle);
        }

        let matched = time_of_day.replace_nanosecond(0).unwrap_or(time_of_day);
        let stamp = drawctl_config::format_time_of_day(matched);
        tracing::info!(
            time_of_day = %stamp,
            target_volume = req.target_volume,
            "scheduled draw"
        );
        let result = self
            .executor
            .submit(req)
            .wrap_err_with(|| format!("scheduled draw at {stamp}"))?;
        self.stats.draws += 1;

        let record = LogRecord::from_result(matched, &result);
        let logged = match self.log.append(date, &record) {
            Ok(()) => true,
            Err(e) => {
                self.stats.log_failures += 1;
                tracing::warn!(
                    error = %format!("{e:#}"),
                    time_of_day = %stamp,
                    "failed to write daily log row; continuing"
                );
                false
            }
        };
        Ok(TickOutcome::Drew {
            record,
            result,
            logged,
        })
    }

    /// Tick until shutdown is requested or `max_ticks` ticks have run.
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<DispatchStats> {
        tracing::info!(
            entries = self.table.len(),
            tick_ms = u64::try_from(self.cfg.tick.as_millis()).unwrap_or(u64::MAX),
            "dispatch loop started"
        );
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::info!("shutdown requested; leaving dispatch loop");
                break;
            }
            if max_ticks.is_some_and(|max| self.stats.ticks >= max) {
                break;
            }
            self.tick()?;
            self.stats.ticks += 1;
            self.clock.sleep(self.cfg.tick);
        }
        Ok(self.stats)
    }
}
