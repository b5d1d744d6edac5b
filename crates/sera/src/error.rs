//! Error types for vault operations.

use sera_core::{TxId, Winston};
use sera_envelope::EnvelopeError;
use sera_ledger::LedgerError;
use sera_resolver::ResolverError;
use thiserror::Error;

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// History resolution error.
    #[error("resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Envelope or key error.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Ledger error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The wallet cannot cover a fee.
    #[error("insufficient funds: {required} winston required, {available} available")]
    InsufficientFunds { required: Winston, available: Winston },

    /// No price oracle produced a usable quote.
    #[error("price unavailable: {0}")]
    PriceUnavailable(String),

    /// A resolved transaction has no retrievable body.
    #[error("transaction body missing: {0}")]
    MissingBody(TxId),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Invalid operation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl VaultError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            VaultError::Resolver(e) => e.is_transient(),
            VaultError::Envelope(e) => e.is_transient(),
            VaultError::Ledger(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Whether the credential does not exist (or no longer exists) for this wallet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VaultError::Resolver(e) if e.is_not_found())
    }
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
