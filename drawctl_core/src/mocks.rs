//! Test and helper doubles for the hardware traits.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use drawctl_traits::{FlowSensor, Valve};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveEvent {
    Open,
    Close,
}

/// Valve that records every transition. Clones share the record, so a clone
/// kept by a test observes a valve that was moved into an executor.
#[derive(Debug, Clone, Default)]
pub struct RecordingValve {
    events: Arc<Mutex<Vec<ValveEvent>>>,
}

impl RecordingValve {
    pub fn events(&self) -> Vec<ValveEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// True when the last recorded transition was an open.
    pub fn is_open(&self) -> bool {
        self.events().last() == Some(&ValveEvent::Open)
    }

    fn push(&self, ev: ValveEvent) {
        if let Ok(mut e) = self.events.lock() {
            e.push(ev);
        }
    }
}

impl Valve for RecordingValve {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.push(ValveEvent::Open);
        Ok(())
    }
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.push(ValveEvent::Close);
        Ok(())
    }
}

/// A dry line: never reports an edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFlow;

impl FlowSensor for NoFlow {
    fn take_edges(&mut self) -> Result<u32, Box<dyn std::error::Error + Send + Sync>> {
        Ok(0)
    }
}

/// Reports a fixed sequence of edge counts, then zeros.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFlow {
    polls: VecDeque<u32>,
}

impl ScriptedFlow {
    pub fn new(polls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            polls: polls.into_iter().collect(),
        }
    }
}

impl FlowSensor for ScriptedFlow {
    fn take_edges(&mut self) -> Result<u32, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.polls.pop_front().unwrap_or(0))
    }
}

/// Reports one edge per poll, then fails on poll number `n + 1`.
#[derive(Debug, Clone)]
pub struct FailingFlow {
    remaining: u32,
}

impl FailingFlow {
    pub fn after(n: u32) -> Self {
        Self { remaining: n }
    }
}

impl FlowSensor for FailingFlow {
    fn take_edges(&mut self) -> Result<u32, Box<dyn std::error::Error + Send + Sync>> {
        if self.remaining == 0 {
            return Err(Box::new(std::io::Error::other("flow input read failed")));
        }
        self.remaining -= 1;
        Ok(1)
    }
}

/// Valve whose output line cannot be driven.
#[derive(Debug, Clone, Copy, Default)]
pub struct StuckValve;

impl Valve for StuckValve {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("valve output not writable".into())
    }
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("valve output not writable".into())
    }
}
