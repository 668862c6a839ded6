//! Actor-style worker pool with per-worker arenas and supervised restarts.
//!
//! A [`WhirlPool`] hosts a fixed set of long-lived workers, each bound to
//! its own OS thread and its own fixed-size memory arena. Submitted work
//! is routed to per-worker bounded mailboxes by a best-effort round-robin
//! cursor; a supervisor thread watches each worker's cooperative liveness
//! flag and rebuilds dead workers in place, resetting the arena over the
//! same memory region so the restarted worker keeps its cache-warm pages.
//!
//! Work procedures are opaque `fn(&[u8], &mut [u8])` over buffers the
//! submitter continues to own. Dispatch is zero-copy, and keeping the
//! buffers alive until the procedure returns is the submitter's contract
//! (see [`WhirlPool::submit`]).
//!
//! # Architecture
//!
//! ```text
//! Layer 0: error, config, metrics   (no internal deps)
//! Layer 1: work, mailbox, arena     (the inert pieces)
//! Layer 2: worker                   (service loop over L1)
//! Layer 3: supervisor, pool         (lifecycle + dispatch over L2)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use whirlpool::{PoolConfig, WhirlPool};
//!
//! fn add_numbers(input: &[u8], output: &mut [u8]) {
//!     let sum: u64 = input.iter().map(|&b| u64::from(b)).sum();
//!     let text = format!("Sum is {sum}");
//!     let n = text.len().min(output.len());
//!     output[..n].copy_from_slice(&text.as_bytes()[..n]);
//! }
//!
//! let pool = WhirlPool::new(PoolConfig::new(4, 1024 * 1024, 10)).unwrap();
//! let input = [10u8, 20];
//! let mut output = [0u8; 32];
//! // SAFETY: both buffers outlive the wait below.
//! unsafe { pool.submit(add_numbers, &input, &mut output).unwrap() };
//! std::thread::sleep(std::time::Duration::from_millis(10));
//! assert!(output.starts_with(b"Sum is 30"));
//! pool.shutdown();
//! ```
//!
//! # What this is not
//!
//! No process isolation, no recovery of in-flight work, no pool growth,
//! no work stealing, no distribution, no persistence. Hard faults inside
//! a work procedure are not caught; the cooperative
//! [`Worker::crash`] flag is the only supported failure signal.

pub mod arena;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod metrics;
pub mod pool;
pub mod supervisor;
pub mod work;
pub mod worker;

pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use metrics::MetricsSnapshot;
pub use pool::WhirlPool;
pub use work::{WorkFn, WorkItem};
pub use worker::Worker;
