//! Error types for the whirlpool worker pool.
//!
//! Every error is returned to the immediate caller. The pool never logs
//! errors, never retries on the caller's behalf, and never translates one
//! kind into another.

use thiserror::Error;

/// Errors surfaced by pool and mailbox operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The targeted mailbox is at capacity; the caller decides retry/drop.
    #[error("mailbox full")]
    MailboxFull,

    /// Every worker was observed dead at dispatch time. Transient while a
    /// supervised restart is in flight.
    #[error("no live worker")]
    NoLiveWorker,

    /// The pid is outside the pool's worker array.
    #[error("pid {pid} out of range (pool has {limit} workers)")]
    InvalidPid {
        /// The offending pid.
        pid: usize,
        /// Number of workers in the pool.
        limit: usize,
    },

    /// The targeted worker is currently down.
    #[error("worker {0} is not alive")]
    NotAlive(usize),

    /// Allocation or thread-spawn failure during pool init or recovery.
    /// Partially constructed state has already been unwound.
    #[error("init failure: {0}")]
    InitFailure(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(PoolError::MailboxFull.to_string(), "mailbox full");
        assert_eq!(
            PoolError::InvalidPid { pid: 9, limit: 4 }.to_string(),
            "pid 9 out of range (pool has 4 workers)"
        );
        assert_eq!(PoolError::NotAlive(2).to_string(), "worker 2 is not alive");
    }
}
