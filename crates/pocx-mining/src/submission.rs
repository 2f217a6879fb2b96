//! Nonce submissions and their context validation.

use pocx_consensus::{AccountId, PlotSeed};
use std::time::Instant;

/// One nonce submission waiting in the queue. Transient; the queue owns it
/// until the worker installs or discards it.
#[derive(Debug, Clone)]
pub struct NonceSubmission {
    pub account_id: AccountId,
    pub seed: PlotSeed,
    pub nonce: u64,
    /// Raw quality, already recomputed at the RPC boundary.
    pub quality: u64,
    pub compression: u32,
    /// Height the submitter mined for; must equal tip height + 1.
    pub expected_height: i32,
    /// Generation signature the submitter mined against.
    pub generation_signature: [u8; 32],
    /// When the submission entered the node.
    pub submit_time: Instant,
}

impl NonceSubmission {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: AccountId,
        seed: PlotSeed,
        nonce: u64,
        quality: u64,
        compression: u32,
        expected_height: i32,
        generation_signature: [u8; 32],
    ) -> Self {
        Self {
            account_id,
            seed,
            nonce,
            quality,
            compression,
            expected_height,
            generation_signature,
            submit_time: Instant::now(),
        }
    }
}

/// Staleness and ranking rules for submissions.
pub struct SubmissionValidator;

impl SubmissionValidator {
    /// A submission is only usable against the exact context it was mined
    /// for; height or gensig drift means it is silently dropped.
    pub fn validate_context(
        submission: &NonceSubmission,
        current_height: i32,
        current_gensig: &[u8; 32],
    ) -> bool {
        submission.expected_height == current_height
            && submission.generation_signature == *current_gensig
    }

    /// Lower quality wins; ties keep the incumbent (first seen).
    pub fn is_better_than_current(new_quality: u64, current_best: Option<u64>) -> bool {
        match current_best {
            None => true,
            Some(best) => new_quality < best,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(height: i32, gensig: [u8; 32]) -> NonceSubmission {
        NonceSubmission::new(
            AccountId([1; 20]),
            PlotSeed([2; 32]),
            7,
            1000,
            1,
            height,
            gensig,
        )
    }

    #[test]
    fn context_match_required() {
        let gensig = [5u8; 32];
        let s = submission(10, gensig);

        assert!(SubmissionValidator::validate_context(&s, 10, &gensig));
        assert!(!SubmissionValidator::validate_context(&s, 11, &gensig));
        assert!(!SubmissionValidator::validate_context(&s, 10, &[6u8; 32]));
    }

    #[test]
    fn lower_quality_wins_ties_keep_first() {
        assert!(SubmissionValidator::is_better_than_current(100, None));
        assert!(SubmissionValidator::is_better_than_current(99, Some(100)));
        assert!(!SubmissionValidator::is_better_than_current(100, Some(100)));
        assert!(!SubmissionValidator::is_better_than_current(101, Some(100)));
    }
}
