//! Shabal-256 with explicit terminator blocks.
//!
//! The compression of one 512-bit block `M` with counter `W`:
//!
//! 1. `B += M` (component-wise, wrapping)
//! 2. `A[0] ^= W_low; A[1] ^= W_high`
//! 3. rotate each `B[i]` left by 17
//! 4. three passes of the 16-step permutation round (48 steps total)
//! 5. add the feedback sums `C[k] + C[k+4] + C[k+8]` into A
//! 6. `C -= M`; swap B and C; increment W
//!
//! Finalisation runs the terminator block once as above (without the C
//! subtraction and swap), then three more times preceded by a B/C swap and
//! the W xor, with W held constant.

use crate::{HASH_SIZE, MESSAGE_SIZE};

/// Shabal-256 initial state vector A (12 words).
pub const A_INIT: [u32; 12] = [
    0x52F84552, 0xE54B7999, 0x2D8EE3EC, 0xB9645191, 0xE0078B86, 0xBB7C44C9, 0xD2B5C1CA, 0xB0D2EB8C,
    0x14CE5A45, 0x22AF50DC, 0xEFFDBC6B, 0xEB21B74A,
];

/// Shabal-256 initial state vector B (16 words).
pub const B_INIT: [u32; 16] = [
    0xB555C6EE, 0x3E710596, 0xA72A652F, 0x9301515F, 0xDA28C1FA, 0x696FD868, 0x9CB6BF72, 0x0AFE4002,
    0xA6E03615, 0x5138C1D4, 0xBE216306, 0xB38B8890, 0x3EA8B96B, 0x3299ACE4, 0x30924DD4, 0x55CB34A5,
];

/// Shabal-256 initial state vector C (16 words).
pub const C_INIT: [u32; 16] = [
    0xB405F031, 0xC4233EBA, 0xB3733979, 0xC0DD9D55, 0xC51C28AE, 0xA327B8E1, 0x56C56167, 0xED614433,
    0x88B59D60, 0x60E2CEBA, 0x758B4B8B, 0x83E82A7F, 0xBC968828, 0xE6E00BF7, 0xBA839E55, 0x9B491C60,
];

pub(crate) struct State {
    pub a: [u32; 12],
    pub b: [u32; 16],
    pub c: [u32; 16],
    pub w_low: u32,
    pub w_high: u32,
}

impl State {
    pub fn new() -> Self {
        Self {
            a: A_INIT,
            b: B_INIT,
            c: C_INIT,
            w_low: 1,
            w_high: 0,
        }
    }

    #[inline]
    fn xor_w(&mut self) {
        self.a[0] ^= self.w_low;
        self.a[1] ^= self.w_high;
    }

    #[inline]
    fn incr_w(&mut self) {
        self.w_low = self.w_low.wrapping_add(1);
        if self.w_low == 0 {
            self.w_high = self.w_high.wrapping_add(1);
        }
    }

    #[inline]
    fn swap_bc(&mut self) {
        std::mem::swap(&mut self.b, &mut self.c);
    }

    /// One application of the P permutation: B rotation, 48 permutation
    /// steps, and the C feedback sums into A.
    fn apply_p(&mut self, m: &[u32; MESSAGE_SIZE]) {
        for x in self.b.iter_mut() {
            *x = x.rotate_left(17);
        }
        // Step s updates A[s mod 12] and B[s mod 16]; the remaining indices
        // follow the fixed offsets of the reference permutation table.
        for s in 0..48 {
            let xa0 = s % 12;
            let xa1 = (s + 11) % 12;
            let xb0 = s % 16;
            let xb1 = (s + 13) % 16;
            let xb2 = (s + 9) % 16;
            let xb3 = (s + 6) % 16;
            let xc = self.c[(16 + 8 - s % 16) % 16];
            let xm = m[s % 16];
            let t = (self.a[xa0] ^ self.a[xa1].rotate_left(15).wrapping_mul(5) ^ xc)
                .wrapping_mul(3)
                ^ self.b[xb1]
                ^ (self.b[xb2] & !self.b[xb3])
                ^ xm;
            self.a[xa0] = t;
            self.b[xb0] = !(self.b[xb0].rotate_left(1) ^ t);
        }
        for i in 0..12 {
            self.a[i] = self.a[i]
                .wrapping_add(self.c[(i + 11) % 16])
                .wrapping_add(self.c[(i + 15) % 16])
                .wrapping_add(self.c[(i + 3) % 16]);
        }
    }

    /// Compress one ordinary message block.
    pub fn compress(&mut self, m: &[u32; MESSAGE_SIZE]) {
        for i in 0..16 {
            self.b[i] = self.b[i].wrapping_add(m[i]);
        }
        self.xor_w();
        self.apply_p(m);
        for i in 0..16 {
            self.c[i] = self.c[i].wrapping_sub(m[i]);
        }
        self.swap_bc();
        self.incr_w();
    }

    /// Compress the terminator block and run the three finalisation rounds.
    /// W is not incremented between the finalisation rounds.
    pub fn finalize(&mut self, term: &[u32; MESSAGE_SIZE]) {
        for i in 0..16 {
            self.b[i] = self.b[i].wrapping_add(term[i]);
        }
        self.xor_w();
        self.apply_p(term);
        for _ in 0..3 {
            self.swap_bc();
            self.xor_w();
            self.apply_p(term);
        }
    }

    /// Digest bytes: B[8..16] as little-endian words.
    pub fn digest(&self) -> [u8; HASH_SIZE] {
        let mut out = [0u8; HASH_SIZE];
        for i in 0..8 {
            out[i * 4..i * 4 + 4].copy_from_slice(&self.b[8 + i].to_le_bytes());
        }
        out
    }
}

#[inline]
fn load_block(bytes: &[u8]) -> [u32; MESSAGE_SIZE] {
    let mut m = [0u32; MESSAGE_SIZE];
    for (i, chunk) in bytes.chunks_exact(4).enumerate() {
        m[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    m
}

/// Shabal-256 over the full 64-byte blocks of `data`, followed by an
/// optional pre-terminator block and the required terminator block.
///
/// Plot generation prepares the terminator blocks itself, so no standard
/// padding is applied here. Bytes past the last full block are ignored;
/// callers fold them in through the pre-terminator instead.
pub fn shabal256(
    data: &[u8],
    pre_term: Option<&[u32; MESSAGE_SIZE]>,
    term: &[u32; MESSAGE_SIZE],
) -> [u8; HASH_SIZE] {
    let mut state = State::new();
    for block in data.chunks_exact(64) {
        let m = load_block(block);
        state.compress(&m);
    }
    if let Some(pt) = pre_term {
        state.compress(pt);
    }
    state.finalize(term);
    state.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_input_with_terminator() {
        let expected: [u8; 32] = [
            0xDA, 0x8F, 0x08, 0xC0, 0x2A, 0x67, 0xBA, 0x9A, 0x56, 0xBD, 0xD0, 0x79, 0x8E, 0x48,
            0xAE, 0x07, 0x14, 0x21, 0x5E, 0x09, 0x3B, 0x5B, 0x85, 0x06, 0x49, 0xA3, 0x77, 0x18,
            0x99, 0x3F, 0x54, 0xA2,
        ];

        let data = [0u8; 64];
        let mut term = [0u32; MESSAGE_SIZE];
        term[0] = 0x80;

        assert_eq!(shabal256(&data, None, &term), expected);
    }

    #[test]
    fn ascii_message_with_data_terminator() {
        let expected: [u8; 32] = [
            0xB4, 0x9F, 0x34, 0xBF, 0x51, 0x86, 0x4C, 0x30, 0x53, 0x3C, 0xC4, 0x6C, 0xC2, 0x54,
            0x2B, 0xDE, 0xC2, 0xF9, 0x6F, 0xD0, 0x6F, 0x5C, 0x53, 0x9A, 0xFF, 0x6E, 0xAD, 0x58,
            0x83, 0xF7, 0x32, 0x7A,
        ];

        let m1: [u32; 16] = [
            0x64636261, 0x68676665, 0x6C6B6A69, 0x706F6E6D, 0x74737271, 0x78777675, 0x302D7A79,
            0x34333231, 0x38373635, 0x42412D39, 0x46454443, 0x4A494847, 0x4E4D4C4B, 0x5251504F,
            0x56555453, 0x5A595857,
        ];
        let m2: [u32; 16] = [
            0x3231302D, 0x36353433, 0x2D393837, 0x64636261, 0x68676665, 0x6C6B6A69, 0x706F6E6D,
            0x74737271, 0x78777675, 0x00807A79, 0x00000000, 0x00000000, 0x00000000, 0x00000000,
            0x00000000, 0x00000000,
        ];

        let mut data = [0u8; 64];
        for (i, w) in m1.iter().enumerate() {
            data[i * 4..i * 4 + 4].copy_from_slice(&w.to_le_bytes());
        }

        assert_eq!(shabal256(&data, None, &m2), expected);
    }

    #[test]
    fn pre_terminator_changes_digest() {
        let data = [0u8; 64];
        let mut term = [0u32; MESSAGE_SIZE];
        term[0] = 0x80;
        let mut pre = [0u32; MESSAGE_SIZE];
        pre[3] = 0xDEADBEEF;

        assert_ne!(shabal256(&data, None, &term), shabal256(&data, Some(&pre), &term));
    }

    #[test]
    fn deterministic_for_multi_block_input() {
        let data = [0x5Au8; 192];
        let mut term = [0u32; MESSAGE_SIZE];
        term[0] = 0x80;

        assert_eq!(shabal256(&data, None, &term), shabal256(&data, None, &term));
    }
}
