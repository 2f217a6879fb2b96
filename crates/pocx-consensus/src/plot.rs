//! Deterministic plot generation.
//!
//! A nonce is a 256 KiB buffer derived from `(account, seed, nonce)` by
//! chained Shabal-256 hashing:
//!
//! 1. The last 32 bytes are the hash of the template block carrying the
//!    seed, the account payload and the big-endian nonce.
//! 2. Walking backwards, each 32-byte slot is the hash of the suffix that
//!    follows it; once the suffix exceeds `HASH_CAP` bytes only the first
//!    `HASH_CAP` bytes are hashed.
//! 3. The whole buffer is XOR-ed with a final hash over itself.
//! 4. The buffer is scattered into the target cache in the interleaved
//!    scoop-pair layout, so scoop `i` of one nonce sits next to scoop `i`
//!    of its neighbours and scoop pairs `(i, 4095 - i)` share a stripe.
//!
//! The layout is part of consensus: quality evaluation reads scoops at
//! `scoop * SCOOP_SIZE` of a single-nonce cache and must see exactly the
//! bytes a plotter would have written.

use crate::{AccountId, ConsensusError, ConsensusResult, PlotSeed};
use pocx_crypto::{shabal256, HASH_SIZE, MESSAGE_SIZE};

/// Number of hashed bytes retained once the chain is deeper than the cap.
pub const HASH_CAP: usize = 4096;

/// Scoops per nonce.
pub const NUM_SCOOPS: usize = 4096;

/// Bytes per scoop.
pub const SCOOP_SIZE: usize = 64;

/// Bytes per nonce (256 KiB).
pub const NONCE_SIZE: usize = NUM_SCOOPS * SCOOP_SIZE;

/// The four template blocks used while filling one nonce buffer.
struct Templates {
    /// seed || account || nonce || 0x80 terminator
    t1: [u32; MESSAGE_SIZE],
    /// account || nonce || 0x80, used together with `pt2`
    t2: [u32; MESSAGE_SIZE],
    /// pre-terminator: first hash || seed
    pt2: [u32; MESSAGE_SIZE],
    /// bare 0x80 terminator for capped hashing
    t3: [u32; MESSAGE_SIZE],
}

impl Templates {
    fn new(account: &AccountId, seed: &PlotSeed, nonce: u64) -> Self {
        let mut payload = [0u32; 5];
        for (i, chunk) in account.0.chunks_exact(4).enumerate() {
            payload[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let mut seed_words = [0u32; 8];
        for (i, chunk) in seed.0.chunks_exact(4).enumerate() {
            seed_words[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        let mut t1 = [0u32; MESSAGE_SIZE];
        t1[0..8].copy_from_slice(&seed_words);
        t1[8..13].copy_from_slice(&payload);
        t1[15] = 0x80;

        let mut t2 = [0u32; MESSAGE_SIZE];
        t2[0..5].copy_from_slice(&payload);
        t2[7] = 0x80;

        let mut pt2 = [0u32; MESSAGE_SIZE];
        pt2[8..16].copy_from_slice(&seed_words);

        let mut t3 = [0u32; MESSAGE_SIZE];
        t3[0] = 0x80;

        // The nonce is written big-endian, then read back as two
        // little-endian words at the fixed template slots.
        let nb = nonce.to_be_bytes();
        let n_lo = u32::from_le_bytes([nb[0], nb[1], nb[2], nb[3]]);
        let n_hi = u32::from_le_bytes([nb[4], nb[5], nb[6], nb[7]]);
        t1[13] = n_lo;
        t1[14] = n_hi;
        t2[5] = n_lo;
        t2[6] = n_hi;

        Self { t1, t2, pt2, t3 }
    }
}

/// Fill one pre-shuffle nonce buffer.
fn fill_nonce_buffer(account: &AccountId, seed: &PlotSeed, nonce: u64, buffer: &mut [u8]) {
    debug_assert_eq!(buffer.len(), NONCE_SIZE);

    let mut t = Templates::new(account, seed, nonce);

    let hash = shabal256(&[], None, &t.t1);
    buffer[NONCE_SIZE - HASH_SIZE..].copy_from_slice(&hash);
    for (i, chunk) in hash.chunks_exact(4).enumerate() {
        t.pt2[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    // Dense fill: hash the full suffix while it still fits under the cap.
    for i in (NONCE_SIZE - HASH_CAP + HASH_SIZE..=NONCE_SIZE - HASH_SIZE)
        .rev()
        .step_by(HASH_SIZE)
    {
        let hash = if i % 64 == 0 {
            shabal256(&buffer[i..], None, &t.t1)
        } else {
            shabal256(&buffer[i..], Some(&t.pt2), &t.t2)
        };
        buffer[i - HASH_SIZE..i].copy_from_slice(&hash);
    }

    // Capped fill: only the first HASH_CAP bytes of the suffix are hashed.
    for i in (HASH_SIZE..=NONCE_SIZE - HASH_CAP).rev().step_by(HASH_SIZE) {
        let hash = shabal256(&buffer[i..i + HASH_CAP], None, &t.t3);
        buffer[i - HASH_SIZE..i].copy_from_slice(&hash);
    }

    let final_hash = shabal256(buffer, None, &t.t1);
    for (i, byte) in buffer.iter_mut().enumerate() {
        *byte ^= final_hash[i % HASH_SIZE];
    }
}

/// Scatter one nonce buffer into the interleaved target layout.
///
/// Half `h` of the source selects scoop `h >> 1` (even halves) or scoop
/// `4095 - (h >> 1)` (odd halves); odd halves land in the second 32 bytes
/// of the destination scoop.
fn unpack_shuffle_scatter(
    source: &[u8],
    target: &mut [u8],
    target_nonce_count: usize,
    target_offset: usize,
) {
    for h in 0..NUM_SCOOPS * 2 {
        let scoop = (h & 1) * (4095 - (h >> 1)) + ((h + 1) & 1) * (h >> 1);
        for j in (0..32).step_by(4) {
            let dest = scoop * SCOOP_SIZE * target_nonce_count
                + target_offset * SCOOP_SIZE
                + (h & 1) * 32
                + j;
            let src = h * 32 + j;
            target[dest..dest + 4].copy_from_slice(&source[src..src + 4]);
        }
    }
}

/// Generate `num_nonces` nonces into `cache`, starting at nonce slot
/// `cache_offset` of the interleaved layout.
///
/// Pure and deterministic: the same `(account, seed, nonce)` always yields
/// the same bytes.
pub fn generate_nonces(
    cache: &mut [u8],
    cache_offset: usize,
    account: &AccountId,
    seed: &PlotSeed,
    start_nonce: u64,
    num_nonces: u64,
) -> ConsensusResult<()> {
    let needed = (cache_offset + num_nonces as usize) * NONCE_SIZE;
    if cache.len() < needed || cache.len() % NONCE_SIZE != 0 {
        return Err(ConsensusError::PlotBuffer {
            needed,
            got: cache.len(),
        });
    }
    let target_nonce_count = cache.len() / NONCE_SIZE;

    let mut buffer = vec![0u8; NONCE_SIZE];
    for n in 0..num_nonces {
        fill_nonce_buffer(account, seed, start_nonce + n, &mut buffer);
        unpack_shuffle_scatter(
            &buffer,
            cache,
            target_nonce_count,
            cache_offset + n as usize,
        );
    }
    Ok(())
}
