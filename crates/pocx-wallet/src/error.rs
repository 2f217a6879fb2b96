//! Wallet error types.

use thiserror::Error;

/// Wallet errors.
#[derive(Error, Debug)]
pub enum WalletError {
    /// Wallet is locked; unlock before signing.
    #[error("Wallet is locked")]
    Locked,

    /// No key stored for the requested account.
    #[error("No private key available for account {0}")]
    KeyNotFound(String),

    /// Malformed key material.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Signing failed inside the backend.
    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;
