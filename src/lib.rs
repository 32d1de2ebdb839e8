//! # tl2stm
//!
//! Software transactional memory based on Transactional Locking II (TL2).
//!
//! Shared state lives in [`TVar`]s. A transaction body reads and writes them
//! through a [`Transaction`]; [`atomically`] runs the body speculatively,
//! validates what it read, and commits all of its writes at once, running the
//! body again whenever a concurrent commit got in the way.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tl2stm::prelude::*;
//!
//! let alice = TVar::new(100);
//! let bob = TVar::new(0);
//!
//! // Move 20 from Alice to Bob
//! atomically(|tx| {
//!     let a = tx.load(&alice);
//!     let b = tx.load(&bob);
//!     tx.store(&alice, a - 20);
//!     tx.store(&bob, b + 20);
//! });
//!
//! let balances = atomically(|tx| (tx.load(&alice), tx.load(&bob)));
//! assert_eq!(balances, (80, 20));
//! ```
//!
//! ## How It Works
//!
//! - Every variable carries a versioned lock: a lock bit and a version packed
//!   into one atomic word.
//! - A global clock orders commits. Each attempt samples it on entry and
//!   rejects any variable written after that point.
//! - Writes are buffered. At commit the write set is locked without waiting,
//!   the clock is advanced, the read set is re-checked if anything else
//!   committed in between, and the new values are published with the new
//!   version.
//! - Read-only transactions take no locks and never advance the clock.
//!
//! ## Rules for Transaction Bodies
//!
//! A body may run several times before one run commits. It should only
//! touch shared state through the [`Transaction`] it is given: no I/O and no
//! non-transactional mutation.
//!
//! ## Bounded Retries
//!
//! [`atomically`] retries until it commits. To give up after a number of
//! conflicts, use an [`Stm`] with [`StmConfig::bounded`]:
//!
//! ```ignore
//! let stm = Stm::new(StmConfig::bounded(16));
//! match stm.atomically(|tx| tx.load(&alice)) {
//!     Ok(balance) => println!("{}", balance),
//!     Err(e) if e.is_retryable() => eprintln!("busy: {}", e),
//!     Err(e) => return Err(e),
//! }
//! ```

#![warn(missing_docs)]

pub mod prelude;

// Engine
pub use tl2_concurrency::{atomically, global_stats, Committed, Stm, StmConfig, StmStats};
pub use tl2_concurrency::{TVar, Transaction};

// Primitives
pub use tl2_core::{global_clock, ConflictKind, GlobalClock, VersionedLock, MAX_VERSION};

// Errors
pub use tl2_core::error::StmError as Error;
pub use tl2_core::Result;
