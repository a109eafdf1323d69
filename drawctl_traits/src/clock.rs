use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Monotonic clock abstraction for draw timing.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            std::hint::spin_loop();
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// now() = origin + offset
/// sleep(d) advances internal time by d without actually sleeping. Clones share
/// the same offset, so a simulated meter and a session see one timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

/// Local wall-clock time, used for schedule matching and daily log naming.
pub trait WallClock {
    fn now_local(&self) -> PrimitiveDateTime;
}

/// Wall clock backed by the system time and a fixed UTC offset.
///
/// The local offset is resolved once at construction; `time` refuses to query
/// it after other threads exist, so build this before spawning the executor.
#[derive(Debug, Clone, Copy)]
pub struct SystemWallClock {
    offset: UtcOffset,
}

impl SystemWallClock {
    /// Resolve the local offset now. Returns the clock and whether the offset
    /// was actually determined (false means UTC was used as a fallback).
    pub fn local() -> (Self, bool) {
        match UtcOffset::current_local_offset() {
            Ok(offset) => (Self { offset }, true),
            Err(_) => (Self::with_offset(UtcOffset::UTC), false),
        }
    }

    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl WallClock for SystemWallClock {
    fn now_local(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_utc().to_offset(self.offset);
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

/// Wall clock that replays a fixed sequence of readings.
///
/// Each `now_local` call pops the next reading; once one reading is left it is
/// returned forever.
#[derive(Debug, Clone)]
pub struct ScriptedWallClock {
    readings: Arc<Mutex<VecDeque<PrimitiveDateTime>>>,
}

impl ScriptedWallClock {
    pub fn new(readings: impl IntoIterator<Item = PrimitiveDateTime>) -> Self {
        Self {
            readings: Arc::new(Mutex::new(readings.into_iter().collect())),
        }
    }

    /// Number of readings not yet consumed.
    pub fn remaining(&self) -> usize {
        self.readings.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl WallClock for ScriptedWallClock {
    fn now_local(&self) -> PrimitiveDateTime {
        let mut readings = match self.readings.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if readings.len() > 1 {
            if let Some(t) = readings.pop_front() {
                return t;
            }
        }
        readings
            .front()
            .copied()
            .unwrap_or(PrimitiveDateTime::MIN)
    }
}
