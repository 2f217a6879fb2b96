//! Mining error types.

use thiserror::Error;

/// Errors from block assembly and submission handling.
#[derive(Error, Debug)]
pub enum MiningError {
    /// Host chain refused a template or block.
    #[error(transparent)]
    Chain(#[from] pocx_chain::ChainError),

    /// Wallet could not provide a key or signature.
    #[error(transparent)]
    Wallet(#[from] pocx_wallet::WalletError),

    /// Consensus-level failure during assembly.
    #[error(transparent)]
    Consensus(#[from] pocx_consensus::ConsensusError),

    /// Block building failed.
    #[error("Block building failed: {0}")]
    BuildFailed(String),
}

/// Result type for mining operations.
pub type MiningResult<T> = Result<T, MiningError>;
