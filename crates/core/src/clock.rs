//! Global version clock
//!
//! A single monotonically increasing counter shared by every transaction in
//! the process. Transactions sample it when they start (their read version)
//! and advance it once when they commit writes (their write version). The
//! clock starts at 0 and is never rolled back or torn down.

use crate::lock::MAX_VERSION;
use std::sync::atomic::{AtomicU64, Ordering};

/// The process-wide clock used by `atomically`
static GLOBAL_CLOCK: GlobalClock = GlobalClock::new();

/// Access the process-wide clock
#[inline]
pub fn global_clock() -> &'static GlobalClock {
    &GLOBAL_CLOCK
}

/// Monotonic version counter
///
/// Every call to [`advance`](Self::advance) returns a distinct value, strictly
/// greater than every value returned before it. Those values are the commit
/// versions that order all write transactions.
#[derive(Debug, Default)]
pub struct GlobalClock {
    now: AtomicU64,
}

impl GlobalClock {
    /// Create a clock at 0
    pub const fn new() -> Self {
        Self {
            now: AtomicU64::new(0),
        }
    }

    /// Read the current time without changing it
    #[inline]
    pub fn sample(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    /// Increment the clock and return the new value
    ///
    /// # Panics
    ///
    /// Panics if the result no longer fits in a versioned lock.
    #[inline]
    pub fn advance(&self) -> u64 {
        let next = self.now.fetch_add(1, Ordering::SeqCst) + 1;
        assert!(next <= MAX_VERSION, "stm: global clock exhausted the version space");
        next
    }
}
