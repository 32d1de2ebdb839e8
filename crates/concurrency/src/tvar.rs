//! Transactional variables
//!
//! A [`TVar`] pairs a [`VersionedLock`] with the current value. The value is
//! held as an `Arc<T>` behind a short-lived `RwLock`, so replacing it is a
//! pointer swap and a reader always gets a whole value. Consistency across
//! several variables is the transaction engine's job, not the variable's.

use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tl2_core::VersionedLock;

/// Identity of a variable inside read and write sets
pub(crate) type VarId = usize;

/// Address-based identity for any pointer to a variable cell
#[inline]
pub(crate) fn var_id<V: ?Sized>(ptr: *const V) -> VarId {
    ptr as *const () as usize
}

/// Heap state shared by every handle to one variable
pub(crate) struct TVarCell<T> {
    lock: VersionedLock,
    value: RwLock<Arc<T>>,
}

impl<T> TVarCell<T> {
    #[inline]
    pub(crate) fn load_value(&self) -> Arc<T> {
        Arc::clone(&self.value.read())
    }

    #[inline]
    pub(crate) fn store_value(&self, value: Arc<T>) {
        *self.value.write() = value;
    }
}

/// Type-erased view of a variable used by the commit protocol
///
/// Read and write sets mix variables of different value types. Commit only
/// needs the lock and a way to install an already-boxed value.
pub(crate) trait ErasedVar: Send + Sync {
    fn lock(&self) -> &VersionedLock;

    /// Install a pending value produced by `Transaction::store`
    fn store_erased(&self, value: Arc<dyn Any + Send + Sync>);
}

impl<T: Send + Sync + 'static> ErasedVar for TVarCell<T> {
    #[inline]
    fn lock(&self) -> &VersionedLock {
        &self.lock
    }

    fn store_erased(&self, value: Arc<dyn Any + Send + Sync>) {
        match value.downcast::<T>() {
            Ok(value) => self.store_value(value),
            Err(_) => panic!("stm: pending value type does not match its variable"),
        }
    }
}

/// A transactional variable
///
/// Read and written only through a [`Transaction`](crate::Transaction) inside
/// [`atomically`](crate::atomically). Cloning a `TVar` produces another handle
/// to the same variable.
///
/// # Example
///
/// ```ignore
/// use tl2_concurrency::{atomically, TVar};
///
/// let counter = TVar::new(0u64);
/// atomically(|tx| {
///     let n = tx.load(&counter);
///     tx.store(&counter, n + 1);
/// });
/// assert_eq!(counter.read_atomic(), 1);
/// ```
pub struct TVar<T> {
    cell: Arc<TVarCell<T>>,
}

impl<T: Send + Sync + 'static> TVar<T> {
    /// Create a variable holding `value`, unlocked at version 0
    pub fn new(value: T) -> Self {
        TVar {
            cell: Arc::new(TVarCell {
                lock: VersionedLock::new(),
                value: RwLock::new(Arc::new(value)),
            }),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> VarId {
        var_id(Arc::as_ptr(&self.cell))
    }

    #[inline]
    pub(crate) fn cell(&self) -> &TVarCell<T> {
        &self.cell
    }

    #[inline]
    pub(crate) fn erased(&self) -> Arc<dyn ErasedVar> {
        Arc::clone(&self.cell) as Arc<dyn ErasedVar>
    }

    #[inline]
    pub(crate) fn lock(&self) -> &VersionedLock {
        &self.cell.lock
    }

    /// Version of the last commit that wrote this variable (0 if none)
    pub fn version(&self) -> u64 {
        self.cell.lock.version()
    }

    /// Whether a committing transaction currently holds this variable
    pub fn is_locked(&self) -> bool {
        self.cell.lock.is_locked()
    }

    /// Copy of the latest committed value, read outside any transaction
    ///
    /// The read is atomic for this one variable only. Use a transaction to
    /// read several variables consistently.
    pub fn read_atomic(&self) -> T
    where
        T: Clone,
    {
        (*self.cell.load_value()).clone()
    }

    /// Check whether two handles refer to the same variable
    pub fn ptr_eq(&self, other: &TVar<T>) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T> Clone for TVar<T> {
    fn clone(&self) -> Self {
        TVar {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Default + Send + Sync + 'static> Default for TVar<T> {
    fn default() -> Self {
        TVar::new(T::default())
    }
}

impl<T> fmt::Debug for TVar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (locked, version) = self.cell.lock.sample();
        f.debug_struct("TVar")
            .field("locked", &locked)
            .field("version", &version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;

    assert_impl_all!(TVar<u64>: Send, Sync, Clone);
    assert_impl_all!(TVar<Vec<String>>: Send, Sync, Clone);

    #[test]
    fn test_new_tvar_state() {
        let x = TVar::new(5);
        assert_eq!(x.version(), 0);
        assert!(!x.is_locked());
        assert_eq!(x.read_atomic(), 5);
    }

    #[test]
    fn test_clone_shares_variable() {
        let x = TVar::new(String::from("a"));
        let y = x.clone();
        assert!(x.ptr_eq(&y));
        assert_eq!(x.id(), y.id());

        let z = TVar::new(String::from("a"));
        assert!(!x.ptr_eq(&z));
        assert_ne!(x.id(), z.id());
    }

    #[test]
    fn test_erased_id_matches_typed_id() {
        let x = TVar::new(1u8);
        let erased = x.erased();
        assert_eq!(var_id(Arc::as_ptr(&erased)), x.id());
    }

    #[test]
    fn test_store_value_swaps_whole_value() {
        let x = TVar::new(vec![1, 2, 3]);
        let before = x.cell().load_value();
        x.cell().store_value(Arc::new(vec![4, 5]));
        assert_eq!(*before, vec![1, 2, 3]);
        assert_eq!(x.read_atomic(), vec![4, 5]);
    }

    #[test]
    fn test_store_erased_installs_value() {
        let x = TVar::new(10i32);
        let erased = x.erased();
        erased.store_erased(Arc::new(20i32));
        assert_eq!(x.read_atomic(), 20);
        // Installing a value does not touch the lock
        assert_eq!(x.version(), 0);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_store_erased_wrong_type_panics() {
        let x = TVar::new(10i32);
        x.erased().store_erased(Arc::new("oops"));
    }

    #[test]
    fn test_default() {
        let x: TVar<u32> = TVar::default();
        assert_eq!(x.read_atomic(), 0);
    }

    #[test]
    fn test_debug_impl() {
        let x = TVar::new(1);
        let debug_str = format!("{:?}", x);
        assert!(debug_str.contains("TVar"));
        assert!(debug_str.contains("version: 0"));
    }
}
