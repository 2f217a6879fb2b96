//! Single-word Shabal-256 for quality evaluation.
//!
//! The quality hash covers exactly 96 bytes: the 32-byte generation
//! signature followed by one 64-byte scoop. That is one ordinary message
//! block (gensig || scoop[0..32]) plus a terminator block carrying the
//! remaining scoop half and the `0x80` end marker, so the whole hash runs
//! in two compressions plus the three finalisation rounds. Only B[8..10]
//! of the final state is needed; it is returned packed as a little-endian
//! u64 instead of the full 32-byte digest.

use crate::shabal256::State;
use crate::MESSAGE_SIZE;

/// Hash one 64-byte scoop with a 32-byte generation signature into a
/// 64-bit quality word. Lower is better.
pub fn shabal256_lite(data: &[u8; 64], gensig: &[u8; 32]) -> u64 {
    let mut m1 = [0u32; MESSAGE_SIZE];
    for i in 0..8 {
        m1[i] = u32::from_le_bytes([
            gensig[i * 4],
            gensig[i * 4 + 1],
            gensig[i * 4 + 2],
            gensig[i * 4 + 3],
        ]);
        m1[i + 8] = u32::from_le_bytes([
            data[i * 4],
            data[i * 4 + 1],
            data[i * 4 + 2],
            data[i * 4 + 3],
        ]);
    }

    let mut m2 = [0u32; MESSAGE_SIZE];
    for i in 0..8 {
        let j = 32 + i * 4;
        m2[i] = u32::from_le_bytes([data[j], data[j + 1], data[j + 2], data[j + 3]]);
    }
    m2[8] = 0x80;

    let mut state = State::new();
    state.compress(&m1);
    state.finalize(&m2);

    (state.b[8] as u64) | ((state.b[9] as u64) << 32)
}
