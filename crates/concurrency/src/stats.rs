//! Commit and abort counters

use std::sync::atomic::{AtomicU64, Ordering};
use tl2_core::ConflictKind;

/// Live counters owned by an [`Stm`](crate::Stm)
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    commits: AtomicU64,
    read_only_commits: AtomicU64,
    inconsistent_reads: AtomicU64,
    lock_failures: AtomicU64,
    validation_failures: AtomicU64,
    retry_limit_hits: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_commit(&self, commit_version: Option<u64>) {
        let counter = match commit_version {
            Some(_) => &self.commits,
            None => &self.read_only_commits,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_conflict(&self, kind: ConflictKind) {
        let counter = match kind {
            ConflictKind::InconsistentRead => &self.inconsistent_reads,
            ConflictKind::LockBusy => &self.lock_failures,
            ConflictKind::ReadSetInvalidated => &self.validation_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry_limit(&self) {
        self.retry_limit_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StmStats {
        StmStats {
            commits: self.commits.load(Ordering::Relaxed),
            read_only_commits: self.read_only_commits.load(Ordering::Relaxed),
            inconsistent_reads: self.inconsistent_reads.load(Ordering::Relaxed),
            lock_failures: self.lock_failures.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            retry_limit_hits: self.retry_limit_hits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of an [`Stm`](crate::Stm)'s counters
///
/// Counters are updated independently, so a snapshot taken while
/// transactions are running may be slightly out of step with itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StmStats {
    /// Transactions that committed writes
    pub commits: u64,
    /// Transactions that finished on the read-only fast path
    pub read_only_commits: u64,
    /// Attempts discarded after an inconsistent load
    pub inconsistent_reads: u64,
    /// Attempts discarded because a write lock was busy
    pub lock_failures: u64,
    /// Attempts discarded by commit-time read-set validation
    pub validation_failures: u64,
    /// Transactions that gave up at the retry limit
    pub retry_limit_hits: u64,
}

impl StmStats {
    /// All discarded attempts
    pub fn total_aborts(&self) -> u64 {
        self.inconsistent_reads + self.lock_failures + self.validation_failures
    }

    /// All successful transactions
    pub fn total_commits(&self) -> u64 {
        self.commits + self.read_only_commits
    }

    /// Fraction of attempts that were discarded
    pub fn abort_rate(&self) -> f64 {
        let attempts = self.total_aborts() + self.total_commits();
        if attempts == 0 {
            0.0
        } else {
            self.total_aborts() as f64 / attempts as f64
        }
    }
}
