//! Transaction merkle root, Bitcoin style.

use crate::types::double_sha256;

/// Merkle root over transaction ids: pairwise double SHA-256 with the last
/// node duplicated on odd levels. An empty list yields the zero root.
pub fn merkle_root(txids: &[[u8; 32]]) -> [u8; 32] {
    if txids.is_empty() {
        return [0u8; 32];
    }

    let mut level: Vec<[u8; 32]> = txids.to_vec();
    let mut preimage = [0u8; 64];
    while level.len() > 1 {
        let mut next: Vec<[u8; 32]> = Vec::with_capacity((level.len() + 1) / 2);
        for pair in level.chunks(2) {
            preimage[..32].copy_from_slice(&pair[0]);
            preimage[32..].copy_from_slice(pair.last().unwrap_or(&pair[0]));
            next.push(double_sha256(&preimage));
        }
        level = next;
    }
    level[0]
}
