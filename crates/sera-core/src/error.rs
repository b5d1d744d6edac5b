//! Error types for Sera Core.

use thiserror::Error;

/// Errors raised while parsing or encoding core types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction id: {0}")]
    InvalidTxId(String),

    #[error("invalid credential id: {0}")]
    InvalidCredentialId(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
