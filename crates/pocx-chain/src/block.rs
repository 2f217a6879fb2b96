//! Block container and the mining-facing chain traits.

use crate::ChainResult;
use pocx_assignments::Transaction;
use pocx_consensus::{merkle_root, BlockHeader};

/// A block: header plus the transactions behind its merkle root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Transaction ids in block order.
    pub fn txids(&self) -> Vec<[u8; 32]> {
        self.transactions.iter().map(|tx| tx.txid()).collect()
    }

    /// Merkle root over the included transactions.
    pub fn compute_merkle_root(&self) -> [u8; 32] {
        merkle_root(&self.txids())
    }
}

/// An unsigned block template: context fields filled, proof and signature
/// still null.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

/// Block template creation (the host chain's `createNewBlock`).
pub trait TemplateProvider: Send + Sync {
    /// Build a template whose coinbase pays to `coinbase_script`.
    fn create_template(&self, coinbase_script: &[u8]) -> ChainResult<BlockTemplate>;
}

/// Submission sink for forged blocks.
pub trait BlockSink: Send + Sync {
    /// Validate and connect a forged block. `Ok(true)` means the block was
    /// accepted and is the new tip.
    fn submit_block(&self, block: &Block) -> ChainResult<bool>;
}
