//! Block assembly and signing.

use crate::scheduler::ForgingCandidate;
use crate::MiningResult;
use pocx_assignments::{create_p2wpkh_script, effective_signer, AssignmentView};
use pocx_chain::{Block, TemplateProvider};
use pocx_consensus::{block_signature_hash, PocProof};
use pocx_wallet::BlockSigner;
use std::sync::Arc;
use tracing::{debug, info};

/// Assembles and signs a block for a validated forging candidate.
///
/// Steps: resolve the effective signer, request a template whose coinbase
/// pays that signer, pin the candidate's context into the header, fill in
/// the PoC proof, recompute the merkle root, write the signer's pubkey,
/// hash, sign.
pub struct BlockBuilder {
    templates: Arc<dyn TemplateProvider>,
    assignments: Arc<dyn AssignmentView>,
    signer: Arc<dyn BlockSigner>,
}

impl BlockBuilder {
    pub fn new(
        templates: Arc<dyn TemplateProvider>,
        assignments: Arc<dyn AssignmentView>,
        signer: Arc<dyn BlockSigner>,
    ) -> Self {
        Self {
            templates,
            assignments,
            signer,
        }
    }

    /// Build and sign a block for `candidate`. Any failure aborts the
    /// forge.
    pub fn build_block(&self, candidate: &ForgingCandidate) -> MiningResult<Block> {
        let signer_account = effective_signer(
            &candidate.account_id,
            candidate.height,
            self.assignments.as_ref(),
        );
        debug!(
            plot = %candidate.account_id,
            signer = %signer_account,
            height = candidate.height,
            "building block"
        );

        let coinbase_script = create_p2wpkh_script(&signer_account);
        let template = self.templates.create_template(&coinbase_script)?;

        let mut block = Block {
            header: template.header,
            transactions: template.transactions,
        };

        // The candidate's context wins over the template's: on the normal
        // path they agree, on the defensive path this rebuilds the
        // contested height after the tip has already moved.
        block.header.height = candidate.height;
        block.header.prev_block = candidate.tip_block_hash;
        block.header.generation_signature = candidate.generation_signature;
        block.header.base_target = candidate.base_target;

        block.header.proof = PocProof {
            seed: candidate.seed,
            account_id: candidate.account_id,
            compression: candidate.compression,
            nonce: candidate.nonce,
            quality: candidate.quality,
        };
        block.header.merkle_root = block.compute_merkle_root();

        block.header.pubkey = self.signer.pubkey(&signer_account)?;

        let block_hash = block.header.block_hash();
        let signing_hash = block_signature_hash(&block_hash);
        block.header.signature = self.signer.sign_compact(&signer_account, &signing_hash)?;

        info!(
            height = candidate.height,
            nonce = candidate.nonce,
            quality = candidate.quality,
            compression = candidate.compression,
            hash = %block.header.block_hash(),
            "block forged"
        );
        Ok(block)
    }
}
