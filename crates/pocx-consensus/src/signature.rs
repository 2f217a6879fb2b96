//! Block signature hashing and compact-signature recovery.
//!
//! Signing is the wallet's job; this module owns the verifier side. The
//! pure recover-and-compare check has no chain-state dependency — whether
//! the recovered signer is *allowed* to sign for the plot is an assignment
//! lookup, layered on top by the chain manager.

use crate::header::BlockHeader;
use crate::types::{double_sha256, AccountId, BlockHash};
use crate::{ConsensusError, ConsensusResult};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1};

/// Magic prefix committed into every block signature.
pub const BLOCK_SIGNATURE_MAGIC: &str = "POCX Signed Block:\n";

fn write_compact_string(out: &mut Vec<u8>, s: &str) {
    debug_assert!(s.len() < 0xFD, "compact size > 1 byte never occurs here");
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

/// Hash that is actually signed: the canonical hash over the magic prefix
/// and the hex encoding of the block hash, both length-prefixed.
pub fn block_signature_hash(block_hash: &BlockHash) -> [u8; 32] {
    let hex = block_hash.to_hex();
    let mut buf = Vec::with_capacity(1 + BLOCK_SIGNATURE_MAGIC.len() + 1 + hex.len());
    write_compact_string(&mut buf, BLOCK_SIGNATURE_MAGIC);
    write_compact_string(&mut buf, &hex);
    double_sha256(&buf)
}

/// Recover the compressed public key from a 65-byte compact signature.
///
/// Layout is `[header, r(32), s(32)]` with `header = 27 + recovery_id`,
/// plus 4 when the signer's key is compressed.
pub fn recover_compact(hash: &[u8; 32], signature: &[u8; 65]) -> ConsensusResult<[u8; 33]> {
    let header = signature[0];
    if !(27..=34).contains(&header) {
        return Err(ConsensusError::InvalidSignature(format!(
            "invalid compact signature header byte {}",
            header
        )));
    }
    let rec_id = RecoveryId::try_from(((header - 27) & 0x03) as i32)
        .map_err(|e| ConsensusError::InvalidSignature(e.to_string()))?;
    let sig = RecoverableSignature::from_compact(&signature[1..], rec_id)
        .map_err(|e| ConsensusError::InvalidSignature(e.to_string()))?;

    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(*hash);
    let pubkey = secp
        .recover_ecdsa(&message, &sig)
        .map_err(|e| ConsensusError::InvalidSignature(format!("recovery failed: {}", e)))?;

    Ok(pubkey.serialize())
}

/// Account id bound to a compressed public key.
pub fn account_id_from_pubkey(pubkey: &[u8; 33]) -> ConsensusResult<AccountId> {
    PublicKey::from_slice(pubkey)
        .map_err(|e| ConsensusError::InvalidSignature(format!("invalid pubkey: {}", e)))?;
    Ok(AccountId::from_pubkey(pubkey))
}

/// Pure signature check: the key recovered from the signature must match
/// the key stored in the header. Says nothing about assignments.
pub fn verify_block_signature(header: &BlockHeader) -> ConsensusResult<()> {
    account_id_from_pubkey(&header.pubkey)?;

    let signing_hash = block_signature_hash(&header.block_hash());
    let recovered = recover_compact(&signing_hash, &header.signature)?;

    if recovered != header.pubkey {
        return Err(ConsensusError::InvalidSignature(
            "recovered pubkey does not match stored pubkey".to_string(),
        ));
    }
    Ok(())
}
