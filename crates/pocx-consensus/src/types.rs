//! Core identifier types and chain hashing.

use crate::{ConsensusError, ConsensusResult};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::fmt;

/// The host chain's canonical 32-byte hash: double SHA-256.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// RIPEMD-160 of SHA-256, the account-id digest over a compressed pubkey.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

fn decode_fixed_hex<const N: usize>(field: &'static str, s: &str) -> ConsensusResult<[u8; N]> {
    if s.len() != N * 2 {
        return Err(ConsensusError::InvalidEncoding {
            field,
            reason: format!("expected {} hex characters, got {}", N * 2, s.len()),
        });
    }
    let bytes = hex::decode(s).map_err(|e| ConsensusError::InvalidEncoding {
        field,
        reason: e.to_string(),
    })?;
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// 20-byte account identifier: RIPEMD-160(SHA-256(compressed pubkey)).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct AccountId(pub [u8; 20]);

impl AccountId {
    /// Parse from 40 lowercase or uppercase hex characters.
    pub fn from_hex(s: &str) -> ConsensusResult<Self> {
        decode_fixed_hex("account_id", s).map(Self)
    }

    /// Derive from a 33-byte compressed public key.
    pub fn from_pubkey(pubkey: &[u8; 33]) -> Self {
        Self(hash160(pubkey))
    }

    /// Lowercase hex encoding (40 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// All-zero account id, the null marker in a PoC proof.
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_hex())
    }
}

/// 32-byte per-plot salt.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlotSeed(pub [u8; 32]);

impl PlotSeed {
    /// Parse from 64 hex characters.
    pub fn from_hex(s: &str) -> ConsensusResult<Self> {
        decode_fixed_hex("seed", s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PlotSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PlotSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlotSeed({})", self.to_hex())
    }
}

/// 32-byte block hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub fn from_hex(s: &str) -> ConsensusResult<Self> {
        decode_fixed_hex("block_hash", s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

/// Parse a 32-byte value (generation signature, txid) from 64 hex characters.
pub fn parse_hex32(field: &'static str, s: &str) -> ConsensusResult<[u8; 32]> {
    decode_fixed_hex(field, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_hex_roundtrip() {
        let id = AccountId::from_hex("99bc78ba577a95a11f1a344d4d2ae55f2f857b98").unwrap();
        assert_eq!(id.to_hex(), "99bc78ba577a95a11f1a344d4d2ae55f2f857b98");

        // Uppercase input is accepted, output is always lowercase
        let upper = AccountId::from_hex("99BC78BA577A95A11F1A344D4D2AE55F2F857B98").unwrap();
        assert_eq!(id, upper);
    }

    #[test]
    fn account_id_rejects_bad_input() {
        assert!(AccountId::from_hex("abcd").is_err());
        assert!(AccountId::from_hex("zzbc78ba577a95a11f1a344d4d2ae55f2f857b98").is_err());
    }

    #[test]
    fn seed_hex_roundtrip() {
        let s = "affeaffeaffeaffeaffeaffeaffeaffeaffeaffeaffeaffeaffeaffeaffeaffe";
        assert_eq!(PlotSeed::from_hex(s).unwrap().to_hex(), s);
        assert!(PlotSeed::from_hex("affe").is_err());
    }

    #[test]
    fn hash160_known_vector() {
        // HASH160 of the empty string
        assert_eq!(
            hex::encode(hash160(b"")),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
    }

    #[test]
    fn double_sha256_known_vector() {
        // SHA-256d of the empty string
        assert_eq!(
            hex::encode(double_sha256(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }
}
