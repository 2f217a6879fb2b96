//! Block header with the PoC proof and signature fields.
//!
//! The PoC fields are serialised in-order after the ordinary header
//! fields; integers are little-endian, byte arrays are raw. The block
//! hash covers the whole header with the signature field zeroed, so the
//! signature can be written after hashing without changing the hash.

use crate::types::{double_sha256, AccountId, BlockHash, PlotSeed};
use crate::{ConsensusError, ConsensusResult};

/// Proof-of-capacity data carried in every block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PocProof {
    /// 32-byte plot seed.
    pub seed: PlotSeed,
    /// 20-byte plot account identifier.
    pub account_id: AccountId,
    /// Compression level used (1..=6).
    pub compression: u32,
    /// Mining nonce.
    pub nonce: u64,
    /// Claimed quality; recomputed at validation time.
    pub quality: u64,
}

impl PocProof {
    /// The null proof: zero nonce and all-zero account id.
    pub fn null() -> Self {
        Self {
            seed: PlotSeed::default(),
            account_id: AccountId::default(),
            compression: 0,
            nonce: 0,
            quality: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.nonce == 0 && self.account_id.is_null()
    }

    fn serialize_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.seed.as_bytes());
        out.extend_from_slice(self.account_id.as_bytes());
        out.extend_from_slice(&self.compression.to_le_bytes());
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out.extend_from_slice(&self.quality.to_le_bytes());
    }

    fn deserialize_from(bytes: &[u8]) -> ConsensusResult<(Self, &[u8])> {
        if bytes.len() < 72 {
            return Err(ConsensusError::InvalidHeader("truncated proof".to_string()));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[0..32]);
        let mut account = [0u8; 20];
        account.copy_from_slice(&bytes[32..52]);
        let compression = u32::from_le_bytes(bytes[52..56].try_into().unwrap());
        let nonce = u64::from_le_bytes(bytes[56..64].try_into().unwrap());
        let quality = u64::from_le_bytes(bytes[64..72].try_into().unwrap());
        Ok((
            Self {
                seed: PlotSeed(seed),
                account_id: AccountId(account),
                compression,
                nonce,
                quality,
            },
            &bytes[72..],
        ))
    }
}

impl Default for PocProof {
    fn default() -> Self {
        Self::null()
    }
}

/// Serialized size of a block header in bytes.
pub const HEADER_SIZE: usize = 4 + 32 + 32 + 4 + 4 + 32 + 8 + 72 + 33 + 65;

/// Block header. PoC consensus fields replace the PoW nBits/nonce pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Header version.
    pub version: i32,
    /// Previous block hash.
    pub prev_block: BlockHash,
    /// Merkle root over the included transactions.
    pub merkle_root: [u8; 32],
    /// Block time, seconds since epoch.
    pub time: u32,
    /// Block height, for context-free validation.
    pub height: i32,
    /// Generation signature at this height.
    pub generation_signature: [u8; 32],
    /// Base target this block was mined against.
    pub base_target: u64,
    /// Proof of capacity.
    pub proof: PocProof,
    /// Compressed public key of the block signer.
    pub pubkey: [u8; 33],
    /// Recoverable compact signature over the signing hash.
    pub signature: [u8; 65],
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            version: 0,
            prev_block: BlockHash::default(),
            merkle_root: [0u8; 32],
            time: 0,
            height: 0,
            generation_signature: [0u8; 32],
            base_target: 0,
            proof: PocProof::null(),
            pubkey: [0u8; 33],
            signature: [0u8; 65],
        }
    }
}

impl BlockHeader {
    fn serialize_with_signature(&self, signature: &[u8; 65]) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.prev_block.0);
        out.extend_from_slice(&self.merkle_root);
        out.extend_from_slice(&self.time.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.generation_signature);
        out.extend_from_slice(&self.base_target.to_le_bytes());
        self.proof.serialize_into(&mut out);
        out.extend_from_slice(&self.pubkey);
        out.extend_from_slice(signature);
        out
    }

    /// Full wire serialization.
    pub fn serialize(&self) -> Vec<u8> {
        self.serialize_with_signature(&self.signature)
    }

    /// Parse a header from its wire serialization.
    pub fn deserialize(bytes: &[u8]) -> ConsensusResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ConsensusError::InvalidHeader(format!(
                "header too short: {} bytes",
                bytes.len()
            )));
        }
        let version = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let mut prev = [0u8; 32];
        prev.copy_from_slice(&bytes[4..36]);
        let mut merkle = [0u8; 32];
        merkle.copy_from_slice(&bytes[36..68]);
        let time = u32::from_le_bytes(bytes[68..72].try_into().unwrap());
        let height = i32::from_le_bytes(bytes[72..76].try_into().unwrap());
        let mut gensig = [0u8; 32];
        gensig.copy_from_slice(&bytes[76..108]);
        let base_target = u64::from_le_bytes(bytes[108..116].try_into().unwrap());
        let (proof, rest) = PocProof::deserialize_from(&bytes[116..])?;
        let mut pubkey = [0u8; 33];
        pubkey.copy_from_slice(&rest[0..33]);
        let mut signature = [0u8; 65];
        signature.copy_from_slice(&rest[33..98]);

        Ok(Self {
            version,
            prev_block: BlockHash(prev),
            merkle_root: merkle,
            time,
            height,
            generation_signature: gensig,
            base_target,
            proof,
            pubkey,
            signature,
        })
    }

    /// Block hash: canonical hash of the header with the signature zeroed.
    pub fn block_hash(&self) -> BlockHash {
        BlockHash(double_sha256(&self.serialize_with_signature(&[0u8; 65])))
    }
}
