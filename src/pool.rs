//! The pool: worker ownership, dispatch, and lifecycle.
//!
//! A [`WhirlPool`] owns a fixed array of workers, a round-robin dispatch
//! cursor, a global running flag, and the supervisor thread. Dispatch is
//! best-effort round-robin: the cursor's load/increment/store is
//! deliberately not an atomic read-modify-write; duplicates and skips
//! under contention are acceptable because the goal is distribution, not
//! fairness, and the fallback scan guarantees progress whenever any
//! worker is alive.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::metrics;
use crate::supervisor;
use crate::work::{WorkFn, WorkItem};
use crate::worker::Worker;

/// State shared between the pool handle and the supervisor thread.
pub(crate) struct PoolCore {
    /// The canonical worker array; created once, never resized.
    pub(crate) workers: Box<[Worker]>,
    /// `false` signals the supervisor (and teardown) to stop.
    pub(crate) running: AtomicBool,
    /// Round-robin dispatch cursor, always in `[0, workers.len())`.
    pub(crate) cursor: AtomicUsize,
    pub(crate) config: PoolConfig,
}

/// A fixed-size supervised worker pool.
///
/// Created with [`WhirlPool::new`]; torn down by [`WhirlPool::shutdown`]
/// or by dropping the handle. The pool owns every worker's memory region
/// and, transitively, its mailbox.
pub struct WhirlPool {
    core: Arc<PoolCore>,
    supervisor: Option<JoinHandle<()>>,
}

impl WhirlPool {
    /// Build the worker array, spawn every service thread, and start the
    /// supervisor.
    ///
    /// On partial failure, workers already constructed are stopped and
    /// joined before the error is returned.
    pub fn new(config: PoolConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(PoolError::InitFailure("worker count must be > 0".into()));
        }
        if config.mailbox_capacity == 0 {
            return Err(PoolError::InitFailure(
                "mailbox capacity must be > 0".into(),
            ));
        }
        if config.memory_per_worker == 0 {
            return Err(PoolError::InitFailure(
                "memory per worker must be > 0".into(),
            ));
        }

        let mut workers = Vec::with_capacity(config.workers);
        for pid in 0..config.workers {
            match Worker::build(
                pid,
                config.memory_per_worker,
                config.mailbox_capacity,
                config.idle_backoff,
            ) {
                Ok(worker) => workers.push(worker),
                // Dropping the vec stops and joins the workers built so far.
                Err(e) => return Err(e),
            }
        }

        let core = Arc::new(PoolCore {
            workers: workers.into_boxed_slice(),
            running: AtomicBool::new(true),
            cursor: AtomicUsize::new(0),
            config,
        });

        let supervisor = supervisor::spawn_supervisor(&core).map_err(|e| {
            core.running.store(false, Ordering::Release);
            for worker in core.workers.iter() {
                worker.stop_and_join();
            }
            PoolError::InitFailure(format!("supervisor spawn failed: {e}"))
        })?;

        tracing::debug!(workers = core.workers.len(), "pool started");
        Ok(Self {
            core,
            supervisor: Some(supervisor),
        })
    }

    /// Submit a procedure over the caller's buffers.
    ///
    /// Round-robin selects a live worker (falling back to an index-order
    /// scan when the cursor lands on a dead one) and enqueues the item.
    /// A full mailbox returns [`PoolError::MailboxFull`] immediately;
    /// this never blocks and never retries. If no worker is alive,
    /// returns [`PoolError::NoLiveWorker`] (transient while a supervised
    /// restart is in flight).
    ///
    /// # Safety
    ///
    /// Same contract as [`WorkItem::new`]: both buffers must stay valid
    /// (and `output` unaliased) until `func` has returned on the worker
    /// thread. The pool does not track completion; the caller coordinates.
    pub unsafe fn submit(&self, func: WorkFn, input: &[u8], output: &mut [u8]) -> Result<()> {
        // SAFETY: Forwarding the caller's buffer contract.
        let item = unsafe { WorkItem::new(func, input, output) };
        self.submit_item(item)
    }

    /// Submit an already-captured [`WorkItem`]. See [`WhirlPool::submit`]
    /// for the dispatch policy.
    pub fn submit_item(&self, item: WorkItem) -> Result<()> {
        let n = self.core.workers.len();

        // Best-effort round-robin: advance first, try the index we read.
        // Not an atomic RMW: racing submitters may duplicate or skip an
        // index, which only skews distribution.
        let c = self.core.cursor.load(Ordering::Acquire);
        self.core.cursor.store((c + 1) % n, Ordering::Release);

        let primary = &self.core.workers[c];
        if primary.is_alive() {
            return primary.push(item);
        }

        // Cursor landed on a dead worker: first live worker in index order.
        for worker in self.core.workers.iter() {
            if worker.is_alive() {
                return worker.push(item);
            }
        }

        metrics::ITEMS_REJECTED.fetch_add(1, Ordering::Relaxed);
        Err(PoolError::NoLiveWorker)
    }

    /// Look up a worker by pid.
    ///
    /// Returns [`PoolError::InvalidPid`] when out of range and
    /// [`PoolError::NotAlive`] when the worker is currently down.
    /// Chiefly for test and recovery flows; production code should prefer
    /// [`WhirlPool::submit`].
    pub fn worker_by_pid(&self, pid: usize) -> Result<&Worker> {
        let worker = self.worker_slot(pid)?;
        if !worker.is_alive() {
            return Err(PoolError::NotAlive(pid));
        }
        Ok(worker)
    }

    /// Explicitly rebuild a worker, dead or not (a live worker is left
    /// untouched). The supervisor does this automatically; this entry
    /// point exists for test and recovery flows.
    ///
    /// Recovery resets the worker's arena over the same memory region and
    /// preserves its mailbox: items enqueued while the worker was down
    /// are executed by the replacement thread.
    pub fn recover(&self, pid: usize) -> Result<()> {
        let worker = self.worker_slot(pid)?;
        supervisor::recover_worker(worker)
    }

    /// Number of workers, fixed at construction.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.core.workers.len()
    }

    /// Number of workers currently observed alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.core.workers.iter().filter(|w| w.is_alive()).count()
    }

    /// Signal everything to stop, join the supervisor, then join and tear
    /// down every worker. Dropping the handle runs the same sequence;
    /// either way it happens exactly once.
    pub fn shutdown(self) {
        drop(self);
    }

    fn worker_slot(&self, pid: usize) -> Result<&Worker> {
        let limit = self.core.workers.len();
        self.core
            .workers
            .get(pid)
            .ok_or(PoolError::InvalidPid { pid, limit })
    }

    fn shutdown_inner(&mut self) {
        self.core.running.store(false, Ordering::Release);

        // Join the supervisor first so nothing can revive a worker while
        // the teardown pass below marks them dead.
        if let Some(handle) = self.supervisor.take() {
            let _ = handle.join();
        }

        for worker in self.core.workers.iter() {
            worker.stop_and_join();
        }

        tracing::debug!("pool shut down");
    }
}

impl Drop for WhirlPool {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

impl std::fmt::Debug for WhirlPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhirlPool")
            .field("workers", &self.core.workers.len())
            .field("live", &self.live_count())
            .finish_non_exhaustive()
    }
}
