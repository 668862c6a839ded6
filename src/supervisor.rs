//! Supervisor: liveness scanning and in-place worker recovery.
//!
//! One long-lived thread owned by the pool. Each tick it scans every
//! worker's `alive` flag and rebuilds any worker observed dead: join the
//! old service thread, reset the arena over the same fixed region, mark
//! the worker alive, and spawn a fresh service thread.
//!
//! Recovery never touches the mailbox. Items enqueued while the worker
//! was down are drained by the replacement thread; work that was in
//! flight when the worker died stays lost.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{PoolError, Result};
use crate::metrics;
use crate::pool::PoolCore;
use crate::worker::{lock_thread, spawn_service_thread, Worker};

/// Spawn the supervisor thread for `core`.
pub(crate) fn spawn_supervisor(core: &Arc<PoolCore>) -> std::io::Result<JoinHandle<()>> {
    let core = Arc::clone(core);
    thread::Builder::new()
        .name("whirlpool-supervisor".into())
        .spawn(move || supervise_loop(&core))
}

/// Scan loop. Exits when the pool's `running` flag drops.
fn supervise_loop(core: &PoolCore) {
    tracing::debug!("supervisor started");

    while core.running.load(Ordering::Acquire) {
        for worker in core.workers.iter() {
            if !core.running.load(Ordering::Acquire) {
                break;
            }
            if !worker.is_alive() {
                if let Err(e) = recover_worker(worker) {
                    // Left dead; retried on the next scan.
                    tracing::debug!(pid = worker.pid(), error = %e, "recovery failed");
                }
            }
        }
        thread::sleep(core.config.supervise_interval);
    }

    tracing::debug!("supervisor exiting");
}

/// Rebuild a dead worker in place. No-op if the worker is alive.
///
/// The whole sequence runs under the worker's thread-handle lock, which
/// serializes concurrent recoverers (the supervisor and an explicit
/// `WhirlPool::recover` call).
pub(crate) fn recover_worker(worker: &Worker) -> Result<()> {
    let shared = &worker.shared;
    let mut slot = lock_thread(shared);

    // Re-check under the lock: a concurrent recoverer may have won.
    if shared.alive.load(Ordering::Acquire) {
        return Ok(());
    }

    // Join the previous service thread, if any. It has either returned
    // already or will at its next flag observation.
    if let Some(handle) = slot.take() {
        let _ = handle.join();
    }

    // SAFETY: `alive` is false and the old thread is joined, so nothing
    // else can touch the arena until we publish `alive = true` below.
    unsafe { (*shared.arena.get()).reset() };

    shared.alive.store(true, Ordering::Release);

    match spawn_service_thread(shared) {
        Ok(handle) => {
            *slot = Some(handle);
            metrics::WORKER_RESTARTS.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(pid = shared.pid, "worker recovered");
            Ok(())
        }
        Err(e) => {
            shared.alive.store(false, Ordering::Release);
            Err(PoolError::InitFailure(format!(
                "worker {}: respawn failed: {e}",
                shared.pid
            )))
        }
    }
}
