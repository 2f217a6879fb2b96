//! Test harness: a regtest chain plus helpers that forge real blocks.

use pocx_assignments::{create_p2wpkh_script, effective_signer, Transaction};
use pocx_chain::{Block, BlockSink, ChainManager, ChainResult, TemplateProvider};
use pocx_consensus::{
    block_signature_hash, calculate_quality, next_generation_signature, time_bent_deadline,
    AccountId, ChainParams, ChainView, PlotSeed, PocProof,
};
use pocx_wallet::{BlockSigner, KeyStore};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seed used by harness plots.
pub const TEST_SEED: [u8; 32] = [0xAF; 32];

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs()
}

/// A regtest chain with one funded forging key.
pub struct TestChain {
    pub chain: Arc<ChainManager>,
    pub keystore: Arc<KeyStore>,
    /// Account with a key in the keystore; used as the default plot.
    pub account: AccountId,
    pub seed: PlotSeed,
}

impl TestChain {
    /// Chain whose genesis is `genesis_offset_secs` in the past.
    pub fn regtest_with_offset(genesis_offset_secs: u64) -> Self {
        let params = ChainParams::regtest();
        let genesis_time = unix_now().saturating_sub(genesis_offset_secs) as u32;
        let chain = Arc::new(ChainManager::with_genesis_time(params, genesis_time));

        let keystore = Arc::new(KeyStore::new());
        let account = keystore
            .import_secret(&[0x42; 32])
            .expect("static test key is valid");

        Self {
            chain,
            keystore,
            account,
            seed: PlotSeed(TEST_SEED),
        }
    }

    pub fn regtest() -> Self {
        Self::regtest_with_offset(0)
    }

    /// Recomputed quality of `nonce` for the next block.
    pub fn next_quality(&self, nonce: u64) -> u64 {
        let ctx = self.chain.new_context().expect("chain has a tip");
        calculate_quality(
            &self.account,
            &self.seed,
            nonce,
            1,
            ctx.height as u64,
            &ctx.generation_signature,
        )
        .expect("quality computation")
    }

    /// Build, sign and submit a fully valid block for `nonce`, optionally
    /// carrying extra transactions. Deadlines are not waited out; the
    /// chain does not gate acceptance on wall-clock spacing.
    pub fn forge_block(&self, nonce: u64, extra_txs: Vec<Transaction>) -> ChainResult<Block> {
        let block = self.prepare_block(nonce, extra_txs, None)?;
        self.chain.submit_block(&block)?;
        Ok(block)
    }

    /// Like `forge_block` but signing with `signer_override` instead of
    /// the resolved effective signer. Used to exercise rejection paths.
    pub fn forge_block_as(
        &self,
        nonce: u64,
        extra_txs: Vec<Transaction>,
        signer_override: Option<AccountId>,
    ) -> ChainResult<Block> {
        let block = self.prepare_block(nonce, extra_txs, signer_override)?;
        self.chain.submit_block(&block)?;
        Ok(block)
    }

    /// Build and sign a block against the current context without
    /// submitting it. Lets tests stage same-height competitors.
    pub fn prepare_block(
        &self,
        nonce: u64,
        extra_txs: Vec<Transaction>,
        signer_override: Option<AccountId>,
    ) -> ChainResult<Block> {
        let ctx = self.chain.new_context()?;
        let quality = calculate_quality(
            &self.account,
            &self.seed,
            nonce,
            1,
            ctx.height as u64,
            &ctx.generation_signature,
        )?;

        let signer = signer_override.unwrap_or_else(|| {
            effective_signer(&self.account, ctx.height, self.chain.as_ref())
        });

        let template = self
            .chain
            .create_template(&create_p2wpkh_script(&signer))?;
        let mut block = Block {
            header: template.header,
            transactions: template.transactions,
        };
        block.transactions.extend(extra_txs);

        block.header.proof = PocProof {
            seed: self.seed,
            account_id: self.account,
            compression: 1,
            nonce,
            quality,
        };
        block.header.merkle_root = block.compute_merkle_root();
        block.header.pubkey = self.keystore.pubkey(&signer).expect("signer key present");

        let signing_hash = block_signature_hash(&block.header.block_hash());
        block.header.signature = self
            .keystore
            .sign_compact(&signer, &signing_hash)
            .expect("wallet unlocked");

        Ok(block)
    }
}

/// Regtest chain whose genesis is backdated so that `nonce`'s time-bent
/// deadline for block 1 has already expired. Lets scheduler tests forge
/// through the real wait path without sleeping for the deadline.
pub fn chain_for_immediate_forge(nonce: u64) -> (TestChain, u64) {
    // The first generation signature only depends on the genesis content,
    // never on the genesis time, so the quality can be computed up front.
    let probe = TestChain::regtest();
    let genesis = probe.chain.tip().expect("genesis");
    let gensig = next_generation_signature(&genesis);

    let quality = calculate_quality(&probe.account, &probe.seed, nonce, 1, 1, &gensig)
        .expect("quality computation");
    let deadline = time_bent_deadline(
        quality,
        probe.chain.params().genesis_base_target(),
        probe.chain.params().target_spacing_secs,
    );

    (TestChain::regtest_with_offset(deadline + 5), quality)
}
