//! Error types for the STM engine
//!
//! Contention is normally invisible: a conflicting attempt is thrown away and
//! the transaction body runs again. The only error a caller can see is the
//! one produced when a configured retry limit runs out.
//!
//! Protocol misuse (releasing a lock that is not held, running out of
//! version space) is not represented here. Those conditions panic.

use std::fmt;
use thiserror::Error;

/// Why an attempt was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// A load saw a locked variable, a version that changed under it, or a
    /// version newer than the attempt's read version
    InconsistentRead,
    /// A write-set lock was held by another committer
    LockBusy,
    /// Commit-time validation found a read-set variable changed or locked
    ReadSetInvalidated,
}

impl ConflictKind {
    /// Short name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::InconsistentRead => "inconsistent_read",
            ConflictKind::LockBusy => "lock_busy",
            ConflictKind::ReadSetInvalidated => "read_set_invalidated",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// STM errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StmError {
    /// The transaction conflicted on every attempt allowed by the retry limit
    #[error("transaction gave up after {attempts} attempts (last conflict: {last_conflict})")]
    RetryLimitExceeded {
        /// Number of attempts made, including the first
        attempts: u32,
        /// Conflict that ended the final attempt
        last_conflict: ConflictKind,
    },
}

impl StmError {
    /// Check if running the transaction again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StmError::RetryLimitExceeded { .. })
    }

    /// Check if this error came from the retry limit
    pub fn is_retry_limit(&self) -> bool {
        matches!(self, StmError::RetryLimitExceeded { .. })
    }

    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            StmError::RetryLimitExceeded { attempts, .. } => *attempts,
        }
    }
}

/// Result type for STM operations
pub type Result<T> = std::result::Result<T, StmError>;
