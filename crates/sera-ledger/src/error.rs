//! Error types for ledger collaborators.

use thiserror::Error;

/// Errors that can occur while talking to a ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The collaborator did not answer in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The collaborator could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Event or draft could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The ledger refused the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Poisoned lock or failed blocking task.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Timeout(_) | LedgerError::Unavailable(_))
    }
}

impl From<tokio::task::JoinError> for LedgerError {
    fn from(e: tokio::task::JoinError) -> Self {
        LedgerError::Internal(format!("blocking task failed: {e}"))
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
