//! Chain manager error types.

use thiserror::Error;

/// Errors from block acceptance and template creation.
#[derive(Error, Debug)]
pub enum ChainError {
    /// Block does not extend the current tip.
    #[error("Block does not connect: {0}")]
    DoesNotConnect(String),

    /// Context fields (height, gensig, base target) disagree with the
    /// deterministic schedule.
    #[error("Invalid block context: {0}")]
    InvalidContext(String),

    /// Consensus-level failure (proof, signature, header).
    #[error(transparent)]
    Consensus(#[from] pocx_consensus::ConsensusError),

    /// Assignment processing failure.
    #[error(transparent)]
    Assignment(#[from] pocx_assignments::AssignmentError),

    /// Signer is not authorised for the plot at this height.
    #[error("Signer {signer} is not the effective signer {expected} for plot {plot}")]
    WrongSigner {
        signer: String,
        expected: String,
        plot: String,
    },

    /// Chain has no blocks yet.
    #[error("Chain is empty")]
    Empty,
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;
