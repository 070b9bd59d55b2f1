//! Store-side failures.

use thiserror::Error as ThisError;

/// Errors raised by [`MemoryStore`](crate::MemoryStore).
///
/// They reach query callers wrapped in [`querylite_core::Error::Store`].
#[derive(Debug, ThisError)]
pub enum StoreError {
    /// A thread panicked while holding the store lock
    #[error("store lock poisoned")]
    LockPoisoned,

    /// Uniqueness or nullability violation
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Query produced more rows than the configured cap
    #[error("query returned {found} rows, limit is {limit}")]
    ResourceLimit {
        /// Configured cap
        limit: usize,
        /// Rows the query matched
        found: usize,
    },

    /// `begin` called while another transaction is open
    #[error("a transaction is already active")]
    TransactionActive,

    /// Snapshot file failed validation
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),

    /// Row or snapshot encoding failed
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Snapshot file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for querylite_core::Error {
    fn from(err: StoreError) -> Self {
        querylite_core::Error::store(err)
    }
}
