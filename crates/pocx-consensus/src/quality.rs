//! Scoop selection and quality evaluation.

use crate::plot::{generate_nonces, NONCE_SIZE, NUM_SCOOPS, SCOOP_SIZE};
use crate::{AccountId, ConsensusError, ConsensusResult, PlotSeed};
use pocx_crypto::{shabal256, shabal256_lite, MESSAGE_SIZE};

/// Derive the scoop index to read at `height` under `gensig`.
///
/// The 64-byte message is `gensig || BE64(height) || 0x80 || 0…`, hashed as
/// a single Shabal terminator block; the low 12 bits of the digest tail
/// select one of the 4096 scoops.
pub fn calculate_scoop(height: u64, gensig: &[u8; 32]) -> u32 {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(gensig);
    data[32..40].copy_from_slice(&height.to_be_bytes());
    data[40] = 0x80;

    let mut term = [0u32; MESSAGE_SIZE];
    for (i, chunk) in data.chunks_exact(4).enumerate() {
        term[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    let hash = shabal256(&[], None, &term);
    (((hash[30] & 0x0F) as u32) << 8) | hash[31] as u32
}

/// Reconstruct the uncompressed scoop for `(nonce, compression)` as the XOR
/// of `2^compression` single-nonce scoops.
///
/// Odd constituents swap the roles of scoop index and nonce-in-warp, which
/// ties compressed plots to both coordinates at once.
pub fn synthesize_scoop(
    account: &AccountId,
    seed: &PlotSeed,
    scoop: u32,
    nonce: u64,
    compression: u32,
) -> ConsensusResult<[u8; SCOOP_SIZE]> {
    if scoop as usize >= NUM_SCOOPS {
        return Err(ConsensusError::InvalidProof(format!(
            "scoop index {} out of range",
            scoop
        )));
    }

    let warp = nonce / NUM_SCOOPS as u64;
    let nonce_in_warp = nonce % NUM_SCOOPS as u64;
    let constituents = 1u64 << compression;

    let mut result = [0u8; SCOOP_SIZE];
    let mut cache = vec![0u8; NONCE_SIZE];
    for i in 0..constituents {
        let (scoop_x, nonce_in_warp_x) = if i % 2 == 0 {
            (scoop as u64, nonce_in_warp)
        } else {
            (nonce_in_warp, scoop as u64)
        };
        let warp_x = constituents * warp + i;
        let nonce_x = warp_x * NUM_SCOOPS as u64 + nonce_in_warp_x;

        generate_nonces(&mut cache, 0, account, seed, nonce_x, 1)?;

        let start = scoop_x as usize * SCOOP_SIZE;
        for (j, byte) in result.iter_mut().enumerate() {
            *byte ^= cache[start + j];
        }
    }
    Ok(result)
}

/// Compute the 64-bit quality of a candidate nonce. Lower is better.
pub fn calculate_quality(
    account: &AccountId,
    seed: &PlotSeed,
    nonce: u64,
    compression: u32,
    height: u64,
    gensig: &[u8; 32],
) -> ConsensusResult<u64> {
    let scoop = calculate_scoop(height, gensig);
    let scoop_data = synthesize_scoop(account, seed, scoop, nonce, compression)?;
    Ok(shabal256_lite(&scoop_data, gensig))
}
