//! Convenient imports for tl2stm.
//!
//! ```ignore
//! use tl2stm::prelude::*;
//!
//! let x = TVar::new(1);
//! atomically(|tx| tx.modify(&x, |v| v + 1));
//! ```

// Entry points
pub use tl2_concurrency::{atomically, Stm};

// Transactional state
pub use tl2_concurrency::{TVar, Transaction};

// Configuration and reporting
pub use tl2_concurrency::{Committed, StmConfig, StmStats};

// Error handling
pub use crate::{Error, Result};
