//! Versioned lock: a lock bit and a version number packed into one word
//!
//! The top bit of the `u64` holds the lock bit and the remaining 63 bits hold
//! the version. The zero word is `(unlocked, version 0)`.
//!
//! ```text
//!  63  62                                                    0
//! +---+-------------------------------------------------------+
//! | L |                      version                          |
//! +---+-------------------------------------------------------+
//! ```
//!
//! # Operations
//!
//! - [`VersionedLock::sample`]: atomic load, no side effects
//! - [`VersionedLock::try_lock`]: one CAS attempt, never spins
//! - [`VersionedLock::unlock`]: release, version unchanged
//! - [`VersionedLock::unlock_and_update`]: release and publish a new version
//!
//! Releasing a lock that is not held, or encoding a version that does not fit
//! in 63 bits, means the commit protocol is already broken. Both panic.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bit holding the lock flag
const LOCK_BIT: u64 = 1 << 63;

/// Mask selecting the version bits
const VERSION_MASK: u64 = LOCK_BIT - 1;

/// Largest version representable in a versioned lock (2^63 - 1)
pub const MAX_VERSION: u64 = VERSION_MASK;

/// Pack `(locked, version)` into a single word
///
/// # Panics
///
/// Panics if `version` exceeds [`MAX_VERSION`].
#[inline]
pub fn encode(locked: bool, version: u64) -> u64 {
    assert!(
        version <= MAX_VERSION,
        "stm: version number exceeds 2^63-1 ({})",
        version
    );
    if locked {
        LOCK_BIT | version
    } else {
        version
    }
}

/// Unpack a word into `(locked, version)`
#[inline]
pub fn decode(word: u64) -> (bool, u64) {
    (word & LOCK_BIT != 0, word & VERSION_MASK)
}

/// Lock bit and version number updated together by atomic operations
///
/// One of these guards every transactional variable. Readers never take the
/// lock; they sample it before and after reading the value and compare.
/// Writers take it with [`try_lock`](Self::try_lock) during commit and release
/// it with [`unlock_and_update`](Self::unlock_and_update) once the new value is
/// in place.
#[derive(Default)]
pub struct VersionedLock {
    word: AtomicU64,
}

impl VersionedLock {
    /// Create an unlocked lock at version 0
    pub const fn new() -> Self {
        Self {
            word: AtomicU64::new(0),
        }
    }

    /// Create a lock in the given state
    ///
    /// # Panics
    ///
    /// Panics if `version` exceeds [`MAX_VERSION`].
    pub fn with_state(locked: bool, version: u64) -> Self {
        Self {
            word: AtomicU64::new(encode(locked, version)),
        }
    }

    /// Atomically read and decode the lock word
    #[inline]
    pub fn sample(&self) -> (bool, u64) {
        decode(self.word.load(Ordering::Acquire))
    }

    /// Current version, ignoring the lock bit
    #[inline]
    pub fn version(&self) -> u64 {
        self.sample().1
    }

    /// Whether the lock bit is currently set
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.sample().0
    }

    /// Raw encoded word
    #[inline]
    pub fn raw(&self) -> u64 {
        self.word.load(Ordering::Acquire)
    }

    /// Try to set the lock bit, keeping the version
    ///
    /// Makes a single compare-and-swap attempt. Returns `false` without
    /// changing anything if the lock is already held or another thread won
    /// the race. Callers decide how to retry.
    #[inline]
    pub fn try_lock(&self) -> bool {
        let current = self.word.load(Ordering::Acquire);
        let (locked, version) = decode(current);
        if locked {
            return false;
        }
        self.word
            .compare_exchange(
                current,
                encode(true, version),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Clear the lock bit, keeping the version
    ///
    /// # Panics
    ///
    /// Panics if the lock is not held.
    pub fn unlock(&self) {
        let (locked, version) = self.sample();
        assert!(locked, "stm: unlock of unlocked versioned-lock");
        self.word.store(encode(false, version), Ordering::Release);
    }

    /// Clear the lock bit and set the version to `version`
    ///
    /// This is the publication point of a commit: readers that sample the
    /// lock after this store see the new version together with the new value.
    ///
    /// # Panics
    ///
    /// Panics if the lock is not held or `version` exceeds [`MAX_VERSION`].
    pub fn unlock_and_update(&self, version: u64) {
        let (locked, _) = self.sample();
        assert!(locked, "stm: unlock of unlocked versioned-lock");
        self.word.store(encode(false, version), Ordering::Release);
    }
}

impl fmt::Debug for VersionedLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (locked, version) = self.sample();
        f.debug_struct("VersionedLock")
            .field("locked", &locked)
            .field("version", &version)
            .finish()
    }
}
