//! Single-slot draw execution.
//!
//! A `DrawExecutor` owns the valve and flow meter on one worker thread and
//! runs one `DrawSession` at a time. `submit` blocks until the draw it asked
//! for is finished. A submission that arrives while another is still in
//! flight waits for it (no cancellation), logs a warning, then runs.
//!
//! Safety: the worker thread is joined when the executor is dropped, and it
//! drives the valve closed on its way out.
use crossbeam_channel as xch;
use drawctl_traits::{Clock, FlowSensor, Valve};
use eyre::WrapErr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::thread::JoinHandle;

use crate::config::DrawCfg;
use crate::error::{DrawError, Result};
use crate::session::{DrawRequest, DrawResult, DrawSession};

struct Job {
    req: DrawRequest,
    reply: xch::Sender<Result<DrawResult>>,
}

pub struct DrawExecutor {
    jobs: Option<xch::Sender<Job>>,
    /// Held for the whole submit-to-result span; this is the single slot.
    gate: Mutex<()>,
    busy: Arc<AtomicBool>,
    completed: Arc<AtomicU64>,
    waited: AtomicU64,
    worker: Option<JoinHandle<()>>,
}

impl core::fmt::Debug for DrawExecutor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DrawExecutor")
            .field("busy", &self.is_busy())
            .field("completed", &self.completed())
            .field("waited", &self.waited())
            .finish()
    }
}

impl DrawExecutor {
    /// Move the rig onto a dedicated worker thread.
    pub fn spawn<V, F>(
        valve: V,
        meter: F,
        cfg: DrawCfg,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self>
    where
        V: Valve + Send + 'static,
        F: FlowSensor + Send + 'static,
    {
        let (tx, rx) = xch::bounded::<Job>(1);
        let busy = Arc::new(AtomicBool::new(false));
        let busy_worker = busy.clone();
        let completed = Arc::new(AtomicU64::new(0));
        let completed_worker = completed.clone();

        let worker = std::thread::Builder::new()
            .name("draw-worker".into())
            .spawn(move || {
                let mut valve = valve;
                let mut meter = meter;
                for job in rx.iter() {
                    busy_worker.store(true, Ordering::Release);
                    let result =
                        DrawSession::new(&mut valve, &mut meter, cfg, &*clock).run(job.req);
                    busy_worker.store(false, Ordering::Release);
                    completed_worker.fetch_add(1, Ordering::Relaxed);
                    // If send fails, the submitter is gone; nothing to report to
                    if job.reply.send(result).is_err() {
                        tracing::debug!("draw submitter disconnected before result");
                    }
                }
                if let Err(e) = valve.close() {
                    tracing::error!(error = %e, "valve close on worker exit failed");
                }
                tracing::trace!("draw worker exiting cleanly");
            })
            .map_err(|e| eyre::Report::new(DrawError::Io(e.to_string())))
            .wrap_err("spawn draw worker")?;

        Ok(Self {
            jobs: Some(tx),
            gate: Mutex::new(()),
            busy,
            completed,
            waited: AtomicU64::new(0),
            worker: Some(worker),
        })
    }

    /// Run one draw and block until its result is available.
    pub fn submit(&self, req: DrawRequest) -> Result<DrawResult> {
        let _slot = match self.gate.try_lock() {
            Ok(slot) => slot,
            Err(TryLockError::WouldBlock) => {
                self.waited.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    target_volume = req.target_volume,
                    "previous draw still running; waiting for it to finish"
                );
                self.gate.lock().unwrap_or_else(PoisonError::into_inner)
            }
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
        };

        let jobs = self.jobs.as_ref().ok_or_else(worker_gone)?;
        let (reply_tx, reply_rx) = xch::bounded(1);
        jobs.send(Job {
            req,
            reply: reply_tx,
        })
        .map_err(|_| worker_gone())?;
        reply_rx.recv().map_err(|_| worker_gone())?
    }

    /// True while a session is running on the worker.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Sessions finished (successfully or not) since spawn.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Submissions that had to wait for a previous draw.
    pub fn waited(&self) -> u64 {
        self.waited.load(Ordering::Relaxed)
    }
}

fn worker_gone() -> eyre::Report {
    eyre::Report::new(DrawError::State("draw worker exited".into()))
}

impl Drop for DrawExecutor {
    fn drop(&mut self) {
        // Disconnect the job channel; the worker finishes any running draw,
        // closes the valve and returns.
        drop(self.jobs.take());
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("draw worker joined"),
                Err(e) => tracing::warn!(?e, "draw worker panicked"),
            }
        }
    }
}
