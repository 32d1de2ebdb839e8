//! Core primitives for tl2stm
//!
//! This crate holds the leaf pieces of the TL2 engine:
//! - [`VersionedLock`]: lock bit and 63-bit version in one atomic word
//! - [`GlobalClock`]: process-wide commit-version counter
//! - [`StmError`] / [`ConflictKind`]: error and conflict classification

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod error;
pub mod lock;

pub use clock::{global_clock, GlobalClock};
pub use error::{ConflictKind, Result, StmError};
pub use lock::{VersionedLock, MAX_VERSION};
