//! Runtime options for [`Stm`](crate::Stm)

/// Default attempt count after which a transaction logs a contention warning
pub const DEFAULT_CONTENTION_WARN_AFTER: u32 = 1_000;

/// STM runtime options
///
/// The defaults reproduce plain TL2: unbounded, immediate retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StmConfig {
    /// Retries allowed after the first attempt, `None` for unbounded
    pub max_retries: Option<u32>,
    /// Attempt count at which a single contention warning is logged
    pub contention_warn_after: u32,
    /// Issue a spin-loop hint before retrying after a busy write lock
    pub spin_on_retry: bool,
}

impl Default for StmConfig {
    fn default() -> Self {
        StmConfig {
            max_retries: None,
            contention_warn_after: DEFAULT_CONTENTION_WARN_AFTER,
            spin_on_retry: false,
        }
    }
}

impl StmConfig {
    /// Retry until commit, however long it takes
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Give up after `max_retries` retries
    pub fn bounded(max_retries: u32) -> Self {
        StmConfig {
            max_retries: Some(max_retries),
            ..Default::default()
        }
    }

    /// Set the retry limit
    pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the warning threshold (clamped to at least 1)
    pub fn with_contention_warn_after(mut self, attempts: u32) -> Self {
        self.contention_warn_after = attempts.max(1);
        self
    }

    /// Enable or disable the spin hint on lock contention
    pub fn with_spin_on_retry(mut self, spin: bool) -> Self {
        self.spin_on_retry = spin;
        self
    }

    /// Total number of attempts allowed, `None` for unbounded
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_retries.map(|r| r.saturating_add(1))
    }
}
