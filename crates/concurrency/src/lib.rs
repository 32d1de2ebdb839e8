//! Transaction engine for tl2stm
//!
//! This crate implements Transactional Locking II (TL2) on top of the
//! primitives in `tl2-core`:
//! - [`TVar`]: transactional variable guarded by a versioned lock
//! - [`Transaction`]: per-attempt read/write sets and the commit protocol
//! - [`Stm`]: retry loop with configuration and statistics
//! - [`atomically`]: run a transaction on the process-wide runner
//!
//! Transaction bodies may run more than once. They must not perform I/O or
//! touch non-transactional mutable state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod manager;
pub mod stats;
pub mod transaction;
pub mod tvar;

pub use config::StmConfig;
pub use manager::{Committed, Stm};
pub use stats::StmStats;
pub use transaction::Transaction;
pub use tvar::TVar;

use once_cell::sync::Lazy;

/// Runner behind [`atomically`], unbounded retries
static DEFAULT_STM: Lazy<Stm> = Lazy::new(Stm::default);

/// Run `body` as a transaction, retrying until it commits
///
/// `body` may be invoked several times; only the result of the committing
/// invocation is returned.
///
/// # Example
///
/// ```ignore
/// use tl2_concurrency::{atomically, TVar};
///
/// let from = TVar::new(100);
/// let to = TVar::new(0);
/// atomically(|tx| {
///     let a = tx.load(&from);
///     let b = tx.load(&to);
///     tx.store(&from, a - 20);
///     tx.store(&to, b + 20);
/// });
/// ```
pub fn atomically<T, F>(body: F) -> T
where
    F: Fn(&mut Transaction) -> T,
{
    DEFAULT_STM.run_unbounded(body).value
}

/// Counters for every transaction run through [`atomically`]
pub fn global_stats() -> StmStats {
    DEFAULT_STM.stats()
}
