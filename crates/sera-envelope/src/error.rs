//! Error types for envelope encryption and key handling.

use sera_ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur while sealing or opening envelopes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Key material is malformed or cannot be used with this codec.
    #[error("unusable key: {0}")]
    KeyFormat(String),

    /// The address has never published a record carrying its key.
    #[error("no public key published for address {0}")]
    KeyNotFound(String),

    /// The credential could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The envelope could not be opened with this key.
    ///
    /// Carries no detail: padding, integrity and length failures are
    /// indistinguishable.
    #[error("decryption failed")]
    Decryption,

    /// Key directory lookup failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl EnvelopeError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EnvelopeError::Ledger(e) if e.is_transient())
    }
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
