//! In-memory chain manager.

use crate::block::{Block, BlockSink, BlockTemplate, TemplateProvider};
use crate::{ChainError, ChainResult};
use parking_lot::RwLock;
use pocx_assignments::{
    connect_block_assignments, create_p2wpkh_script, disconnect_block_assignments,
    effective_signer, AssignmentStore, AssignmentView, CoinView, ForgingAssignment, ForgingUndo,
    OutPoint, Transaction, TxIn, TxOut,
};
use pocx_consensus::{
    account_id_from_pubkey, new_block_context, verify_block_signature, AccountId, BlockHeader,
    BlockSummary, ChainParams, ChainView, NewBlockContext, PocProof,
};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Block subsidy with four-year halvings, in base units.
pub fn block_subsidy(height: i32, halving_interval: i64) -> u64 {
    let halvings = (height as i64 / halving_interval.max(1)) as u32;
    if halvings >= 64 {
        return 0;
    }
    (50 * 100_000_000u64) >> halvings
}

struct IndexEntry {
    summary: BlockSummary,
    block: Block,
}

/// Undo data for one connected block.
struct BlockUndo {
    assignment_undos: Vec<ForgingUndo>,
    created_coins: Vec<OutPoint>,
    spent_coins: Vec<(OutPoint, TxOut)>,
}

struct ChainInner {
    blocks: Vec<IndexEntry>,
    assignments: AssignmentStore,
    coins: HashMap<OutPoint, TxOut>,
    undo_stack: Vec<BlockUndo>,
}

impl ChainInner {
    fn revert_undo(&mut self, undo: &BlockUndo) {
        for outpoint in &undo.created_coins {
            self.coins.remove(outpoint);
        }
        for (outpoint, coin) in &undo.spent_coins {
            self.coins.insert(*outpoint, coin.clone());
        }
        disconnect_block_assignments(&mut self.assignments, &undo.assignment_undos);
    }
}

/// Minimal host chain: linear block index, assignment table, coins table.
///
/// Storage, mempool, script execution and networking stay with the
/// surrounding node; this keeps exactly the state the PoC core reads.
pub struct ChainManager {
    params: ChainParams,
    inner: RwLock<ChainInner>,
}

impl ChainManager {
    /// New chain with a genesis block stamped `genesis_time`.
    pub fn with_genesis_time(params: ChainParams, genesis_time: u32) -> Self {
        let genesis_header = BlockHeader {
            version: 1,
            time: genesis_time,
            base_target: params.genesis_base_target(),
            ..BlockHeader::default()
        };
        let summary = BlockSummary {
            hash: genesis_header.block_hash(),
            prev_hash: genesis_header.prev_block,
            height: 0,
            time: genesis_time as i64,
            base_target: genesis_header.base_target,
            generation_signature: genesis_header.generation_signature,
            account_id: AccountId::default(),
            quality: 0,
        };
        info!(hash = %summary.hash, "chain initialised at genesis");

        Self {
            params,
            inner: RwLock::new(ChainInner {
                blocks: vec![IndexEntry {
                    summary,
                    block: Block {
                        header: genesis_header,
                        transactions: Vec::new(),
                    },
                }],
                assignments: AssignmentStore::new(),
                coins: HashMap::new(),
                undo_stack: Vec::new(),
            }),
        }
    }

    /// New chain with genesis stamped at the current wall clock.
    pub fn new(params: ChainParams) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        Self::with_genesis_time(params, now)
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Current chain height.
    pub fn height(&self) -> i32 {
        self.inner.read().blocks.len() as i32 - 1
    }

    /// Context for mining or validating the next block.
    pub fn new_context(&self) -> ChainResult<NewBlockContext> {
        Ok(new_block_context(self, &self.params)?)
    }

    /// Mint a spendable coin directly into the coins table. Wallet funding
    /// for tests and regtest setups; real coins arrive via blocks.
    pub fn fund(&self, owner: &AccountId, value: u64) -> OutPoint {
        let mut inner = self.inner.write();
        let mut txid = [0u8; 32];
        txid[..20].copy_from_slice(owner.as_bytes());
        txid[20..28].copy_from_slice(&(inner.coins.len() as u64).to_le_bytes());
        let outpoint = OutPoint { txid, vout: 0 };
        inner.coins.insert(
            outpoint,
            TxOut {
                value,
                script_pubkey: create_p2wpkh_script(owner),
            },
        );
        outpoint
    }

    /// All coins currently paying to `owner`.
    pub fn coins_of(&self, owner: &AccountId) -> Vec<(OutPoint, TxOut)> {
        let script = create_p2wpkh_script(owner);
        self.inner
            .read()
            .coins
            .iter()
            .filter(|(_, coin)| coin.script_pubkey == script)
            .map(|(op, coin)| (*op, coin.clone()))
            .collect()
    }

    fn validate_context(&self, header: &BlockHeader, ctx: &NewBlockContext) -> ChainResult<()> {
        if header.height != ctx.height {
            return Err(ChainError::InvalidContext(format!(
                "height {} != expected {}",
                header.height, ctx.height
            )));
        }
        if header.prev_block != ctx.block_hash {
            return Err(ChainError::DoesNotConnect(format!(
                "prev {} != tip {}",
                header.prev_block, ctx.block_hash
            )));
        }
        if header.generation_signature != ctx.generation_signature {
            return Err(ChainError::InvalidContext(
                "generation signature mismatch".to_string(),
            ));
        }
        if header.base_target != ctx.base_target {
            return Err(ChainError::InvalidContext(format!(
                "base target {} != expected {}",
                header.base_target, ctx.base_target
            )));
        }
        Ok(())
    }

    /// Full PoC validation: proof recomputation, pure signature check,
    /// then the effective-signer policy layered on top.
    fn validate_block(&self, block: &Block, ctx: &NewBlockContext) -> ChainResult<u64> {
        let header = &block.header;

        if header.proof.is_null() {
            return Err(ChainError::Consensus(
                pocx_consensus::ConsensusError::InvalidProof("null proof".to_string()),
            ));
        }

        if block.compute_merkle_root() != header.merkle_root {
            return Err(ChainError::InvalidContext(
                "merkle root mismatch".to_string(),
            ));
        }

        let bounds = self.params.compression_bounds(header.height as i64);
        pocx_consensus::check_compression_bounds(header.proof.compression, &bounds)?;

        let validation = pocx_consensus::validate_proof(
            &header.generation_signature,
            header.base_target,
            &header.proof.account_id,
            header.height as u64,
            header.proof.nonce,
            &header.proof.seed,
            header.proof.compression,
            self.params.target_spacing_secs,
        )?;

        verify_block_signature(header)?;

        let signer = account_id_from_pubkey(&header.pubkey)?;
        let expected = {
            let inner = self.inner.read();
            effective_signer(&header.proof.account_id, header.height, &inner.assignments)
        };
        if signer != expected {
            return Err(ChainError::WrongSigner {
                signer: signer.to_hex(),
                expected: expected.to_hex(),
                plot: header.proof.account_id.to_hex(),
            });
        }

        Ok(validation.quality)
    }

    fn connect(&self, block: &Block, quality: u64) -> ChainResult<()> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let coins_snapshot = CoinsSnapshot(&inner.coins);
        let assignment_undos = connect_block_assignments(
            &mut inner.assignments,
            &block.transactions,
            block.header.height,
            &coins_snapshot,
            self.params.assignment_activation_delay,
        )?;

        let mut spent_coins = Vec::new();
        let mut created_coins = Vec::new();
        for (tx_index, tx) in block.transactions.iter().enumerate() {
            // The first transaction is the coinbase; its input spends nothing.
            if tx_index > 0 {
                for input in &tx.inputs {
                    if let Some(coin) = inner.coins.remove(&input.prevout) {
                        spent_coins.push((input.prevout, coin));
                    }
                }
            }
            let txid = tx.txid();
            for (vout, output) in tx.outputs.iter().enumerate() {
                if output.value == 0 {
                    continue;
                }
                let outpoint = OutPoint {
                    txid,
                    vout: vout as u32,
                };
                inner.coins.insert(outpoint, output.clone());
                created_coins.push(outpoint);
            }
        }

        let summary = BlockSummary {
            hash: block.header.block_hash(),
            prev_hash: block.header.prev_block,
            height: block.header.height,
            time: block.header.time as i64,
            base_target: block.header.base_target,
            generation_signature: block.header.generation_signature,
            account_id: block.header.proof.account_id,
            quality,
        };
        info!(
            height = summary.height,
            hash = %summary.hash,
            quality,
            "block connected"
        );
        inner.blocks.push(IndexEntry {
            summary,
            block: block.clone(),
        });
        inner.undo_stack.push(BlockUndo {
            assignment_undos,
            created_coins,
            spent_coins,
        });
        Ok(())
    }

    /// Disconnect the tip block, reversing its state changes.
    pub fn disconnect_tip(&self) -> ChainResult<()> {
        let (entry, _) = self.pop_tip()?;
        info!(height = entry.summary.height, "block disconnected");
        Ok(())
    }

    fn pop_tip(&self) -> ChainResult<(IndexEntry, Option<BlockUndo>)> {
        let mut inner = self.inner.write();
        if inner.blocks.len() <= 1 {
            return Err(ChainError::Empty);
        }
        let entry = inner.blocks.pop().expect("length checked above");
        let undo = inner.undo_stack.pop();
        if let Some(undo) = &undo {
            inner.revert_undo(undo);
        }
        Ok((entry, undo))
    }

    /// Same-height tie-break: a competing block whose recomputed quality is
    /// lower than the tip's replaces it.
    fn try_tip_replacement(&self, block: &Block) -> ChainResult<bool> {
        let tip = self.tip().ok_or(ChainError::Empty)?;
        if block.header.height != tip.height || block.header.prev_block != tip.prev_hash {
            return Ok(false);
        }

        let (saved, _) = self.pop_tip()?;

        let verdict = self
            .new_context()
            .and_then(|ctx| {
                self.validate_context(&block.header, &ctx)?;
                self.validate_block(block, &ctx)
            })
            .and_then(|quality| {
                if quality < saved.summary.quality {
                    self.connect(block, quality)?;
                    Ok(true)
                } else {
                    debug!(
                        quality,
                        tip_quality = saved.summary.quality,
                        "competing block loses tie-break"
                    );
                    Ok(false)
                }
            });

        match verdict {
            Ok(true) => {
                info!(
                    height = block.header.height,
                    "tip replaced by lower-quality block"
                );
                Ok(true)
            }
            Ok(false) => {
                // Replay the saved tip; it validated against this exact
                // state when it first connected.
                self.connect(&saved.block, saved.summary.quality)?;
                Ok(false)
            }
            Err(e) => {
                self.connect(&saved.block, saved.summary.quality)?;
                Err(e)
            }
        }
    }
}

struct CoinsSnapshot<'a>(&'a HashMap<OutPoint, TxOut>);

impl CoinView for CoinsSnapshot<'_> {
    fn coin(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.0.get(outpoint).cloned()
    }
}

impl ChainView for ChainManager {
    fn tip(&self) -> Option<BlockSummary> {
        self.inner.read().blocks.last().map(|e| e.summary.clone())
    }

    fn ancestor(&self, height: i32) -> Option<BlockSummary> {
        if height < 0 {
            return None;
        }
        self.inner
            .read()
            .blocks
            .get(height as usize)
            .map(|e| e.summary.clone())
    }
}

impl AssignmentView for ChainManager {
    fn assignment(&self, plot: &AccountId) -> Option<ForgingAssignment> {
        self.inner.read().assignments.assignment(plot)
    }
}

impl CoinView for ChainManager {
    fn coin(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.inner.read().coins.get(outpoint).cloned()
    }
}

impl TemplateProvider for ChainManager {
    fn create_template(&self, coinbase_script: &[u8]) -> ChainResult<BlockTemplate> {
        let ctx = self.new_context()?;
        let tip = self.tip().ok_or(ChainError::Empty)?;

        let coinbase = Transaction {
            inputs: vec![TxIn {
                prevout: OutPoint {
                    txid: [0u8; 32],
                    vout: ctx.height as u32,
                },
            }],
            outputs: vec![TxOut {
                value: block_subsidy(ctx.height, self.params.subsidy_halving_interval),
                script_pubkey: coinbase_script.to_vec(),
            }],
        };

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let time = now.max(tip.time + 1) as u32;

        let header = BlockHeader {
            version: 2,
            prev_block: ctx.block_hash,
            merkle_root: pocx_consensus::merkle_root(&[coinbase.txid()]),
            time,
            height: ctx.height,
            generation_signature: ctx.generation_signature,
            base_target: ctx.base_target,
            proof: PocProof::null(),
            pubkey: [0u8; 33],
            signature: [0u8; 65],
        };

        debug!(height = ctx.height, "block template created");
        Ok(BlockTemplate {
            header,
            transactions: vec![coinbase],
        })
    }
}

impl BlockSink for ChainManager {
    fn submit_block(&self, block: &Block) -> ChainResult<bool> {
        let ctx = self.new_context()?;

        if let Err(context_error) = self.validate_context(&block.header, &ctx) {
            // A block contesting the tip's height may still win the
            // deterministic tie-break.
            if self.try_tip_replacement(block)? {
                return Ok(true);
            }
            warn!(%context_error, "block rejected");
            return Err(context_error);
        }

        let quality = self.validate_block(block, &ctx)?;
        self.connect(block, quality)?;
        Ok(true)
    }
}
