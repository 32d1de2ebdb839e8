//! Per-attempt transaction record and the TL2 commit protocol
//!
//! A [`Transaction`] lives for exactly one attempt. It records:
//! - `read_version`: clock sample taken when the attempt began
//! - the read set: every variable loaded from shared state
//! - the write set: pending values, last write wins
//! - the first conflict observed, if any
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. Conflict recorded during the body? -> discard
//! 2. Write set empty?                  -> done (read-only fast path)
//! 3. try_lock every write-set variable  -> on failure release, discard
//! 4. write_version = clock.advance()
//! 5. write_version != read_version + 1 -> re-validate the read set,
//!                                         on failure release, discard
//! 6. install pending values, unlock_and_update(write_version)
//! ```
//!
//! Locks are never waited on and every failure path releases what it took,
//! so no attempt holds a lock while waiting for another one.

use crate::tvar::{var_id, ErasedVar, TVar, VarId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::any::Any;
use std::sync::atomic::{fence, Ordering};
use std::sync::Arc;
use tl2_core::{ConflictKind, GlobalClock};

/// Pending write for one variable
struct WriteEntry {
    var: Arc<dyn ErasedVar>,
    value: Arc<dyn Any + Send + Sync>,
}

/// Bookkeeping for a single transaction attempt
///
/// Handed to the body passed to [`atomically`](crate::atomically). All shared
/// state must be accessed through [`load`](Self::load) and
/// [`store`](Self::store).
///
/// A load that observes an inconsistent variable does not interrupt the body.
/// The attempt is marked as conflicted, the (possibly stale) value is still
/// returned, and the whole attempt is thrown away once the body finishes.
pub struct Transaction {
    read_version: u64,
    write_version: Option<u64>,
    conflict: Option<ConflictKind>,
    read_set: SmallVec<[Arc<dyn ErasedVar>; 8]>,
    write_set: FxHashMap<VarId, WriteEntry>,
}

impl Transaction {
    /// Start an attempt that reads as of `read_version`
    pub(crate) fn begin(read_version: u64) -> Self {
        Transaction {
            read_version,
            write_version: None,
            conflict: None,
            read_set: SmallVec::new(),
            write_set: FxHashMap::default(),
        }
    }

    /// Read the value of `var` in this transaction
    ///
    /// Returns the pending value if this attempt already stored to `var`.
    pub fn load<T>(&mut self, var: &TVar<T>) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        (*self.load_shared(var)).clone()
    }

    /// Read the value of `var` without cloning it
    pub fn load_shared<T>(&mut self, var: &TVar<T>) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        if let Some(entry) = self.write_set.get(&var.id()) {
            // Read-your-own-write: no lock or version check
            return match Arc::clone(&entry.value).downcast::<T>() {
                Ok(value) => value,
                Err(_) => panic!("stm: pending value type does not match its variable"),
            };
        }

        let (pre_locked, pre_version) = var.lock().sample();
        let value = var.cell().load_value();
        // The value read above must not be reordered after the second sample
        fence(Ordering::Acquire);
        let (post_locked, post_version) = var.lock().sample();

        if pre_locked
            || post_locked
            || pre_version != post_version
            || post_version > self.read_version
        {
            self.mark_conflict(ConflictKind::InconsistentRead);
        }
        self.read_set.push(var.erased());
        value
    }

    /// Stage `value` as the new value of `var`
    ///
    /// Nothing is visible to other transactions until commit. A later store
    /// to the same variable replaces this one.
    pub fn store<T>(&mut self, var: &TVar<T>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.write_set.insert(
            var.id(),
            WriteEntry {
                var: var.erased(),
                value: Arc::new(value),
            },
        );
    }

    /// Load `var`, apply `f`, and store the result
    pub fn modify<T, F>(&mut self, var: &TVar<T>, f: F)
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> T,
    {
        let current = self.load(var);
        self.store(var, f(current));
    }

    /// Clock sample this attempt reads as of
    pub fn read_version(&self) -> u64 {
        self.read_version
    }

    /// Commit version, set once the attempt has committed writes
    pub fn write_version(&self) -> Option<u64> {
        self.write_version
    }

    /// Whether this attempt has already seen an inconsistent read
    pub fn is_aborted(&self) -> bool {
        self.conflict.is_some()
    }

    /// First conflict observed by this attempt
    pub fn conflict(&self) -> Option<ConflictKind> {
        self.conflict
    }

    /// Whether nothing has been stored so far
    pub fn is_read_only(&self) -> bool {
        self.write_set.is_empty()
    }

    /// Number of loads that went to shared state
    pub fn read_set_len(&self) -> usize {
        self.read_set.len()
    }

    /// Number of distinct variables stored to
    pub fn write_set_len(&self) -> usize {
        self.write_set.len()
    }

    fn mark_conflict(&mut self, kind: ConflictKind) {
        if self.conflict.is_none() {
            self.conflict = Some(kind);
        }
    }

    /// Finish the attempt
    ///
    /// Returns `Ok(None)` for a read-only commit, `Ok(Some(write_version))`
    /// when writes were installed, and `Err(kind)` when the attempt must be
    /// discarded. No lock is held when this returns.
    pub(crate) fn commit(&mut self, clock: &GlobalClock) -> Result<Option<u64>, ConflictKind> {
        if let Some(kind) = self.conflict {
            return Err(kind);
        }
        if self.write_set.is_empty() {
            return Ok(None);
        }

        if let Err(kind) = self.lock_write_set() {
            self.mark_conflict(kind);
            return Err(kind);
        }

        let write_version = clock.advance();

        // Nobody committed between our read version and now
        if write_version != self.read_version + 1 {
            if let Err(kind) = self.validate_read_set() {
                self.release_write_set();
                self.mark_conflict(kind);
                return Err(kind);
            }
        }

        for (_, entry) in self.write_set.drain() {
            entry.var.store_erased(entry.value);
            entry.var.lock().unlock_and_update(write_version);
        }
        self.write_version = Some(write_version);
        Ok(Some(write_version))
    }

    /// Take every write-set lock or none of them
    fn lock_write_set(&self) -> Result<(), ConflictKind> {
        let mut acquired: SmallVec<[&Arc<dyn ErasedVar>; 8]> = SmallVec::new();
        for entry in self.write_set.values() {
            if !entry.var.lock().try_lock() {
                for var in acquired {
                    var.lock().unlock();
                }
                return Err(ConflictKind::LockBusy);
            }
            acquired.push(&entry.var);
        }
        Ok(())
    }

    /// Check that nothing read has been changed or locked by someone else
    fn validate_read_set(&self) -> Result<(), ConflictKind> {
        for var in &self.read_set {
            let (locked, version) = var.lock().sample();
            let ours = self.write_set.contains_key(&var_id(Arc::as_ptr(var)));
            if (locked && !ours) || version > self.read_version {
                return Err(ConflictKind::ReadSetInvalidated);
            }
        }
        Ok(())
    }

    fn release_write_set(&self) {
        for entry in self.write_set.values() {
            entry.var.lock().unlock();
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("read_version", &self.read_version)
            .field("write_version", &self.write_version)
            .field("conflict", &self.conflict)
            .field("read_set_len", &self.read_set.len())
            .field("write_set_len", &self.write_set.len())
            .finish()
    }
}
