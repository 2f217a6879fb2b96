//! # pocx-consensus
//!
//! Consensus rules for the PoCX proof-of-capacity chain.
//!
//! This crate provides:
//! - Deterministic plot generation (the 256 KiB nonce buffer)
//! - Scoop selection and quality evaluation against a generation signature
//! - The time-bending transform from raw quality to a wall-clock deadline
//! - Base-target (difficulty) adjustment over a rolling window
//! - The generation-signature schedule
//! - Block header and PoC proof types with canonical serialization
//! - Block signature hashing and compact-signature recovery
//!
//! ## Proof of Capacity
//!
//! Miners pre-compute plot files indexed by a 20-byte account identifier.
//! Each nonce of a plot is a 256 KiB buffer of chained Shabal-256 output,
//! split into 4096 scoops of 64 bytes. At every block one scoop index is
//! derived from the generation signature; the Shabal-256 "lite" hash of
//! that scoop yields a 64-bit quality, and the time-bending transform maps
//! the best quality to the number of seconds the miner must wait before it
//! may publish a block.

pub mod bigint;
pub mod deadline;
pub mod difficulty;
mod error;
pub mod header;
pub mod merkle;
pub mod params;
pub mod plot;
pub mod quality;
pub mod signature;
mod types;
pub mod validation;

pub use deadline::time_bent_deadline;
pub use difficulty::{
    new_block_context, next_base_target, next_generation_signature, BlockSummary, ChainView,
    NewBlockContext,
};
pub use error::{ConsensusError, ConsensusResult};
pub use header::{BlockHeader, PocProof, HEADER_SIZE};
pub use merkle::merkle_root;
pub use params::{
    compression_bounds, genesis_base_target, ChainNetwork, ChainParams, CompressionBounds,
};
pub use plot::{generate_nonces, HASH_CAP, NONCE_SIZE, NUM_SCOOPS, SCOOP_SIZE};
pub use quality::{calculate_quality, calculate_scoop, synthesize_scoop};
pub use signature::{
    account_id_from_pubkey, block_signature_hash, recover_compact, verify_block_signature,
    BLOCK_SIGNATURE_MAGIC,
};
pub use types::{double_sha256, hash160, parse_hex32, AccountId, BlockHash, PlotSeed};
pub use validation::{check_compression_bounds, validate_proof, ProofValidation};
