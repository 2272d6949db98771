//! Worker pool for asynchronous delivery.
//!
//! The pool owns a fixed number of lanes. Each lane is one OS thread draining
//! its own unbounded queue in FIFO order. Jobs carry a routing key and a key
//! always maps to the same lane, which keeps per-observer ordering.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::EventBusError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Outcome of draining the pool on shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainOutcome {
    /// Every queued job ran before the deadline.
    Drained,
    /// The deadline passed; this many jobs were discarded or still running.
    TimedOut { abandoned: usize },
    /// Shutdown was requested from a lane; the queues drain in the
    /// background under the same deadline.
    Deferred,
    /// The pool was already shut down.
    AlreadyStopped,
}

#[derive(Default)]
struct Shared {
    /// Jobs submitted but not yet finished
    pending: Mutex<usize>,
    idle: Condvar,
    cancelled: AtomicBool,
}

impl Shared {
    /// Wait for outstanding jobs, cancelling the rest once `grace` passes
    fn drain(&self, grace: Duration) -> DrainOutcome {
        let mut pending = self.pending.lock();
        let result = self
            .idle
            .wait_while_for(&mut pending, |pending| *pending > 0, grace);
        if result.timed_out() {
            self.cancelled.store(true, Ordering::SeqCst);
            DrainOutcome::TimedOut {
                abandoned: *pending,
            }
        } else {
            DrainOutcome::Drained
        }
    }

    fn finish_one(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.idle.notify_all();
        }
    }
}

pub(crate) struct WorkerPool {
    lanes: Mutex<Option<Vec<mpsc::UnboundedSender<Job>>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    lane_threads: Vec<ThreadId>,
    shared: Arc<Shared>,
    lane_count: usize,
}

impl WorkerPool {
    /// Spawn `workers` lanes (at least one)
    pub(crate) fn new(workers: usize) -> Result<Self, EventBusError> {
        let lane_count = workers.max(1);
        let shared = Arc::new(Shared::default());
        let mut senders = Vec::with_capacity(lane_count);
        let mut handles = Vec::with_capacity(lane_count);

        for lane in 0..lane_count {
            let (tx, rx) = mpsc::unbounded_channel::<Job>();
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("homebus-worker-{}", lane))
                .spawn(move || run_lane(rx, shared))
                .map_err(|e| EventBusError::WorkerSpawn(e.to_string()))?;
            senders.push(tx);
            handles.push(handle);
        }

        tracing::debug!(workers = lane_count, "Worker pool started");

        let lane_threads = handles.iter().map(|h| h.thread().id()).collect();
        Ok(Self {
            lanes: Mutex::new(Some(senders)),
            handles: Mutex::new(handles),
            lane_threads,
            shared,
            lane_count,
        })
    }

    pub(crate) fn lane_count(&self) -> usize {
        self.lane_count
    }

    /// Queue a job on the lane owned by `key`
    pub(crate) fn submit(&self, key: usize, job: Job) -> Result<(), EventBusError> {
        let lanes = self.lanes.lock();
        let Some(lanes) = lanes.as_ref() else {
            return Err(EventBusError::ShutDown);
        };

        *self.shared.pending.lock() += 1;
        if lanes[key % self.lane_count].send(job).is_err() {
            self.shared.finish_one();
            return Err(EventBusError::ShutDown);
        }
        Ok(())
    }

    /// Stop accepting jobs, wait up to `grace` for the queues to empty, then
    /// cancel whatever is left.
    ///
    /// Called from inside a job, the lane cannot run anything queued behind
    /// that job until it returns, so the wait moves to a watchdog thread and
    /// this returns [`DrainOutcome::Deferred`] at once.
    pub(crate) fn shutdown(&self, grace: Duration) -> DrainOutcome {
        let Some(senders) = self.lanes.lock().take() else {
            return DrainOutcome::AlreadyStopped;
        };
        // Closing the channels lets each lane exit once its queue is empty.
        drop(senders);

        if self.on_lane() {
            self.drain_in_background(grace);
            return DrainOutcome::Deferred;
        }

        let outcome = self.shared.drain(grace);
        let handles = std::mem::take(&mut *self.handles.lock());
        if outcome == DrainOutcome::Drained {
            for handle in handles {
                if handle.join().is_err() {
                    tracing::warn!("Worker lane exited abnormally");
                }
            }
        }
        // On timeout the handles are dropped, detaching lanes still running a callback.

        outcome
    }

    fn on_lane(&self) -> bool {
        self.lane_threads.contains(&thread::current().id())
    }

    fn drain_in_background(&self, grace: Duration) {
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("homebus-drain".to_string())
            .spawn(move || {
                if let DrainOutcome::TimedOut { abandoned } = shared.drain(grace) {
                    tracing::warn!(abandoned, "Deliveries discarded after shutdown grace period");
                }
            });
        if let Err(e) = spawned {
            // Without a watchdog the lanes still drain, just without a deadline.
            tracing::warn!(error = %e, "Could not start shutdown watchdog");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.lanes.get_mut().is_some() {
            self.shutdown(Duration::ZERO);
        }
    }
}

fn run_lane(mut rx: mpsc::UnboundedReceiver<Job>, shared: Arc<Shared>) {
    while let Some(job) = rx.blocking_recv() {
        if !shared.cancelled.load(Ordering::SeqCst)
            && catch_unwind(AssertUnwindSafe(job)).is_err()
        {
            tracing::error!("Worker job panicked");
        }
        shared.finish_one();
    }
}
