//! Pool configuration.
//!
//! A [`PoolConfig`] is plain data: worker count, per-worker memory, and
//! mailbox capacity, plus the two loop cadences (idle backoff, supervise
//! interval). Defaults follow the runtime's conventions; an optional env
//! override layer exists as a convenience and is not part of the core
//! contract.

use std::thread;
use std::time::Duration;

/// Hard upper bound on the worker count, matching what the supervisor can
/// reasonably scan per tick.
pub const MAX_WORKERS: usize = 256;

/// Environment variable honored by [`PoolConfig::with_env_overrides`].
pub const WORKERS_ENV: &str = "WHIRLPOOL_WORKERS";

/// Construction-time parameters for a [`crate::WhirlPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of workers. Fixed for the pool's lifetime.
    pub workers: usize,
    /// Size in bytes of each worker's arena region.
    pub memory_per_worker: usize,
    /// Slot capacity of each worker's mailbox. Must be > 0.
    pub mailbox_capacity: usize,
    /// Sleep between empty-mailbox polls in the service loop.
    pub idle_backoff: Duration,
    /// Sleep between liveness scans in the supervisor loop.
    pub supervise_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4)
            .clamp(1, MAX_WORKERS);
        Self {
            workers,
            memory_per_worker: 1024 * 1024,
            mailbox_capacity: 64,
            idle_backoff: Duration::from_millis(1),
            supervise_interval: Duration::from_millis(10),
        }
    }
}

impl PoolConfig {
    /// Config with explicit sizing and default cadences.
    #[must_use]
    pub fn new(workers: usize, memory_per_worker: usize, mailbox_capacity: usize) -> Self {
        Self {
            workers,
            memory_per_worker,
            mailbox_capacity,
            ..Self::default()
        }
    }

    /// Apply environment overrides.
    ///
    /// `WHIRLPOOL_WORKERS` replaces the worker count when it parses to a
    /// positive integer; the value is clamped to `1..=MAX_WORKERS`.
    /// Invalid values are ignored with a warning.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var(WORKERS_ENV) {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => self.workers = n.clamp(1, MAX_WORKERS),
                _ => tracing::warn!(value = %val, "ignoring invalid {WORKERS_ENV}"),
            }
        }
        self
    }
}
