//! Error types for consensus validation.

use thiserror::Error;

/// Consensus validation errors.
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// Malformed hex input or wrong length.
    #[error("Invalid {field}: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    /// Plot buffer too small or offset out of range.
    #[error("Invalid plot buffer: need {needed} bytes, got {got}")]
    PlotBuffer { needed: usize, got: usize },

    /// Invalid PoC proof.
    #[error("Invalid PoC proof: {0}")]
    InvalidProof(String),

    /// Compression level outside the allowed bounds.
    #[error("Invalid compression level {level}: must be in range [{min}, {max}]")]
    CompressionOutOfBounds { level: u32, min: u32, max: u32 },

    /// Invalid block signature.
    #[error("Invalid block signature: {0}")]
    InvalidSignature(String),

    /// Invalid block header.
    #[error("Invalid block header: {0}")]
    InvalidHeader(String),

    /// Chain has no tip.
    #[error("Block chain tip is empty")]
    EmptyChain,
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
