//! Error types for history resolution.

use sera_core::{Address, CredentialId};
use sera_ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur while resolving credential history.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// No Edit, Create or Share event exists for this id and address.
    #[error("credential {id} not found for {address}")]
    CredentialNotFound { id: CredentialId, address: Address },

    /// The query collaborator timed out or was unreachable. Safe to retry.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// The query collaborator failed authoritatively.
    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    /// A resolution task was lost.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResolverError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ResolverError::TransientNetwork(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolverError::CredentialNotFound { .. })
    }
}

impl From<LedgerError> for ResolverError {
    fn from(e: LedgerError) -> Self {
        if e.is_transient() {
            ResolverError::TransientNetwork(e.to_string())
        } else {
            ResolverError::Ledger(e)
        }
    }
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;
