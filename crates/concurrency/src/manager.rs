//! Transaction runner: the retry loop around the TL2 commit protocol
//!
//! [`Stm`] executes a transaction body against a fresh [`Transaction`] until
//! one attempt commits. Every attempt is independent: all attempt-local state,
//! including pending writes, is dropped before the next one starts.
//!
//! ## Attempt Sequence
//!
//! ```text
//! 1. read_version = clock.sample()
//! 2. run the body to completion against a new Transaction
//! 3. Transaction::commit()
//!      Ok(None)     -> read-only, return the result
//!      Ok(Some(v))  -> committed at version v, return the result
//!      Err(kind)    -> count the conflict, check the retry limit, go to 1
//! ```
//!
//! Retries are immediate. With the default configuration the loop never
//! gives up, so a pathologically contended transaction may spin forever.

use crate::config::StmConfig;
use crate::stats::{StatsCounters, StmStats};
use crate::transaction::Transaction;
use tl2_core::{global_clock, ConflictKind, GlobalClock, Result, StmError};
use tracing::{debug, trace, warn};

/// Result of a committed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    /// Value returned by the body on the committing attempt
    pub value: T,
    /// Commit version, `None` for the read-only fast path
    pub commit_version: Option<u64>,
    /// Attempts made, including the one that committed
    pub attempts: u32,
}

impl<T> Committed<T> {
    /// Whether the transaction committed without writes
    pub fn is_read_only(&self) -> bool {
        self.commit_version.is_none()
    }
}

/// Runs transactions and keeps statistics about them
///
/// All `Stm` instances share the process-wide clock, so variables may be used
/// freely across instances and with [`atomically`](crate::atomically).
///
/// # Thread Safety
///
/// `Stm` is `Sync`; share it by reference or `Arc` and call
/// [`run`](Self::run) from any number of threads. Transactions only contend
/// when their variable sets overlap.
///
/// # Example
///
/// ```ignore
/// use tl2_concurrency::{Stm, StmConfig, TVar};
///
/// let stm = Stm::new(StmConfig::bounded(100));
/// let x = TVar::new(1);
/// let doubled = stm.atomically(|tx| {
///     let v = tx.load(&x) * 2;
///     tx.store(&x, v);
///     v
/// })?;
/// ```
#[derive(Debug)]
pub struct Stm {
    config: StmConfig,
    clock: &'static GlobalClock,
    stats: StatsCounters,
}

impl Stm {
    /// Create a runner on the process-wide clock
    pub fn new(config: StmConfig) -> Self {
        Self::with_clock(config, global_clock())
    }

    /// Create a runner on a specific clock
    ///
    /// Variables touched through this runner must never be used with a runner
    /// on a different clock.
    pub(crate) fn with_clock(config: StmConfig, clock: &'static GlobalClock) -> Self {
        Stm {
            config,
            clock,
            stats: StatsCounters::default(),
        }
    }

    /// Runner options
    pub fn config(&self) -> &StmConfig {
        &self.config
    }

    /// Snapshot of the commit/abort counters
    pub fn stats(&self) -> StmStats {
        self.stats.snapshot()
    }

    /// Run `body` atomically and return its result
    ///
    /// # Errors
    ///
    /// Returns [`StmError::RetryLimitExceeded`] if a retry limit is configured
    /// and every allowed attempt conflicted.
    pub fn atomically<T, F>(&self, body: F) -> Result<T>
    where
        F: Fn(&mut Transaction) -> T,
    {
        self.run(body).map(|committed| committed.value)
    }

    /// Run `body` atomically and report how the commit went
    ///
    /// # Errors
    ///
    /// Returns [`StmError::RetryLimitExceeded`] if a retry limit is configured
    /// and every allowed attempt conflicted.
    pub fn run<T, F>(&self, body: F) -> Result<Committed<T>>
    where
        F: Fn(&mut Transaction) -> T,
    {
        self.execute(&body, self.config.max_retries)
    }

    /// Run `body` until it commits, ignoring any configured retry limit
    pub(crate) fn run_unbounded<T, F>(&self, body: F) -> Committed<T>
    where
        F: Fn(&mut Transaction) -> T,
    {
        match self.execute(&body, None) {
            Ok(committed) => committed,
            Err(e) => unreachable!("stm: unbounded run stopped retrying: {}", e),
        }
    }

    fn execute<T, F>(&self, body: &F, max_retries: Option<u32>) -> Result<Committed<T>>
    where
        F: Fn(&mut Transaction) -> T,
    {
        let mut attempts: u32 = 0;
        let mut warned = false;

        loop {
            attempts = attempts.saturating_add(1);

            let mut txn = Transaction::begin(self.clock.sample());
            let value = body(&mut txn);

            let conflict = match txn.commit(self.clock) {
                Ok(commit_version) => {
                    self.stats.record_commit(commit_version);
                    if let Some(version) = commit_version {
                        debug!(
                            commit_version = version,
                            read_version = txn.read_version(),
                            reads = txn.read_set_len(),
                            attempts,
                            "transaction committed"
                        );
                    }
                    return Ok(Committed {
                        value,
                        commit_version,
                        attempts,
                    });
                }
                Err(kind) => kind,
            };

            self.stats.record_conflict(conflict);
            trace!(
                attempt = attempts,
                read_version = txn.read_version(),
                conflict = %conflict,
                "transaction attempt discarded"
            );

            if let Some(max) = max_retries {
                if attempts > max {
                    self.stats.record_retry_limit();
                    debug!(attempts, last_conflict = %conflict, "retry limit reached");
                    return Err(StmError::RetryLimitExceeded {
                        attempts,
                        last_conflict: conflict,
                    });
                }
            }

            if !warned && attempts >= self.config.contention_warn_after {
                warned = true;
                warn!(
                    attempts,
                    last_conflict = %conflict,
                    "transaction is retrying under heavy contention"
                );
            }

            if self.config.spin_on_retry && conflict == ConflictKind::LockBusy {
                std::hint::spin_loop();
            }
        }
    }
}

impl Default for Stm {
    fn default() -> Self {
        Self::new(StmConfig::default())
    }
}
