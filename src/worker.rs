//! Workers: numbered, thread-bound execution units.
//!
//! A worker owns a fixed arena region, a bounded mailbox, a cooperative
//! liveness flag, and (while alive) exactly one service thread. The
//! service loop drains the mailbox in FIFO order and invokes each item's
//! procedure to completion; an empty mailbox is polled with a short
//! backoff sleep.
//!
//! Liveness is cooperative: a worker is dead iff its `alive` flag reads
//! `false`. The flag is the sole cross-thread signalling channel: the
//! worker's own loop observes it to exit, and the supervisor observes it
//! to rebuild the worker. Nothing here catches hardware or runtime
//! faults; a hard fault in a work procedure takes the process down.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::arena::{self, Arena};
use crate::error::{PoolError, Result};
use crate::mailbox::Mailbox;
use crate::metrics;
use crate::work::WorkItem;

/// State shared between the pool, the supervisor, and the worker's
/// current service thread.
pub(crate) struct WorkerShared {
    /// Dense identity, equal to the worker's index in the pool array.
    pub(crate) pid: usize,
    /// Cooperative liveness flag. Release stores, acquire loads.
    pub(crate) alive: AtomicBool,
    /// Inbound queue. Declared before `arena` so teardown drops the
    /// mailbox first, then the arena (which unmaps the region).
    pub(crate) mailbox: Mailbox,
    /// Bump arena over the worker's fixed region. Accessed without a lock:
    /// the service thread touches it only while `alive` is true, and the
    /// supervisor only after the thread has been joined.
    pub(crate) arena: UnsafeCell<Arena>,
    /// Handle of the current service thread. The supervisor takes, joins,
    /// and replaces it during recovery.
    pub(crate) thread: Mutex<Option<JoinHandle<()>>>,
    /// Sleep between empty-mailbox polls.
    pub(crate) idle_backoff: Duration,
}

// SAFETY: `alive` is atomic, `mailbox` and `thread` are internally
// synchronized, and `arena` is confined to one thread at a time by the
// worker state machine (service thread while alive; supervisor only
// between join and respawn).
unsafe impl Sync for WorkerShared {}

/// A pool worker. Obtained by reference from
/// [`crate::WhirlPool::worker_by_pid`]; the pool owns it for its whole
/// lifetime.
pub struct Worker {
    pub(crate) shared: Arc<WorkerShared>,
}

impl Worker {
    /// Construct a worker: map its region, build its mailbox, mark it
    /// alive, and spawn its service thread.
    pub(crate) fn build(
        pid: usize,
        memory_per_worker: usize,
        mailbox_capacity: usize,
        idle_backoff: Duration,
    ) -> Result<Self> {
        let arena = Arena::new(memory_per_worker).ok_or_else(|| {
            PoolError::InitFailure(format!(
                "worker {pid}: failed to map {memory_per_worker} byte region"
            ))
        })?;

        let shared = Arc::new(WorkerShared {
            pid,
            alive: AtomicBool::new(true),
            mailbox: Mailbox::new(mailbox_capacity),
            arena: UnsafeCell::new(arena),
            thread: Mutex::new(None),
            idle_backoff,
        });

        let handle = spawn_service_thread(&shared).map_err(|e| {
            shared.alive.store(false, Ordering::Release);
            PoolError::InitFailure(format!("worker {pid}: thread spawn failed: {e}"))
        })?;
        *lock_thread(&shared) = Some(handle);

        Ok(Self { shared })
    }

    /// The worker's dense identity, equal to its index in the pool.
    #[must_use]
    pub fn pid(&self) -> usize {
        self.shared.pid
    }

    /// Current liveness.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire)
    }

    /// Mark this worker dead. Chiefly for tests and fault injection: the
    /// service thread exits at its next flag observation, and the
    /// supervisor rebuilds the worker on its next scan.
    pub fn crash(&self) {
        self.shared.alive.store(false, Ordering::Release);
        tracing::debug!(pid = self.shared.pid, "worker marked dead");
    }

    /// Enqueue an item directly on this worker's mailbox.
    ///
    /// Does not check liveness: items queued while the worker is down
    /// survive and are drained by the replacement thread after recovery.
    pub fn push(&self, item: WorkItem) -> Result<()> {
        match self.shared.mailbox.push(item) {
            Ok(()) => {
                metrics::ITEMS_SUBMITTED.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                metrics::ITEMS_REJECTED.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn mailbox_len(&self) -> usize {
        self.shared.mailbox.len()
    }

    /// Signal the service loop to exit and join its thread. Idempotent:
    /// a second call finds no handle and returns immediately.
    pub(crate) fn stop_and_join(&self) {
        self.shared.alive.store(false, Ordering::Release);
        let handle = lock_thread(&self.shared).take();
        if let Some(h) = handle {
            let _ = h.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("pid", &self.shared.pid)
            .field("alive", &self.is_alive())
            .field("queued", &self.mailbox_len())
            .finish()
    }
}

pub(crate) fn lock_thread(
    shared: &WorkerShared,
) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
    match shared.thread.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Spawn a service thread bound to `shared`. Used at construction and by
/// the supervisor during recovery.
pub(crate) fn spawn_service_thread(
    shared: &Arc<WorkerShared>,
) -> std::io::Result<JoinHandle<()>> {
    let shared = Arc::clone(shared);
    thread::Builder::new()
        .name(format!("whirlpool-worker-{}", shared.pid))
        .spawn(move || service_loop(&shared))
}

/// Service loop: drain the mailbox while alive, sleeping briefly when it
/// is empty. Runs on the worker's dedicated thread.
fn service_loop(shared: &WorkerShared) {
    tracing::debug!(pid = shared.pid, "service thread started");

    while shared.alive.load(Ordering::Acquire) {
        match shared.mailbox.pop() {
            Some(item) => {
                // Route scratch allocations to this worker's arena for
                // the duration of the item.
                let prev = arena::set_scratch_arena(shared.arena.get());
                // SAFETY: The submit contract guarantees the item's
                // buffers are valid until its procedure returns.
                unsafe { item.run() };
                arena::set_scratch_arena(prev);
                metrics::ITEMS_EXECUTED.fetch_add(1, Ordering::Relaxed);
            }
            None => thread::sleep(shared.idle_backoff),
        }
    }

    tracing::debug!(pid = shared.pid, "service thread exiting");
}
