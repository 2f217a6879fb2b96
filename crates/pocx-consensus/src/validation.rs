//! Proof-of-capacity validation.

use crate::deadline::time_bent_deadline;
use crate::params::CompressionBounds;
use crate::quality::calculate_quality;
use crate::{AccountId, ConsensusError, ConsensusResult, PlotSeed};
use tracing::debug;

/// Outcome of a successful proof validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofValidation {
    /// Recomputed raw quality.
    pub quality: u64,
    /// Difficulty-adjusted deadline in seconds: `quality / base_target`.
    pub deadline: u64,
    /// Time-bent deadline in seconds.
    pub poc_time: u64,
}

/// Reject compression levels outside the height-dependent bounds.
pub fn check_compression_bounds(
    compression: u32,
    bounds: &CompressionBounds,
) -> ConsensusResult<()> {
    if compression < bounds.min_compression || compression > bounds.target_compression {
        return Err(ConsensusError::CompressionOutOfBounds {
            level: compression,
            min: bounds.min_compression,
            max: bounds.target_compression,
        });
    }
    Ok(())
}

/// Recompute the quality of a claimed proof and derive both deadlines.
///
/// The claimed quality in a header is never trusted; validators always
/// re-derive it from the plot coordinates.
pub fn validate_proof(
    gensig: &[u8; 32],
    base_target: u64,
    account_id: &AccountId,
    height: u64,
    nonce: u64,
    seed: &PlotSeed,
    compression: u32,
    target_spacing_secs: u64,
) -> ConsensusResult<ProofValidation> {
    if account_id.is_null() {
        return Err(ConsensusError::InvalidProof(
            "account id is all zeros".to_string(),
        ));
    }

    let quality = calculate_quality(account_id, seed, nonce, compression, height, gensig)?;

    let deadline = if base_target > 0 {
        quality / base_target
    } else {
        u64::MAX
    };
    let poc_time = time_bent_deadline(quality, base_target, target_spacing_secs);

    debug!(
        account = %account_id,
        nonce,
        compression,
        quality,
        deadline,
        poc_time,
        "proof validated"
    );

    Ok(ProofValidation {
        quality,
        deadline,
        poc_time,
    })
}
