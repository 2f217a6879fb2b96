//! # pocx-crypto
//!
//! Shabal-256 hash engine for the PoCX proof-of-capacity scheme.
//!
//! This crate provides:
//! - The full Shabal-256 compression with optional pre-terminator and
//!   required terminator blocks, as used by plot generation
//! - A "lite" variant that hashes a fixed 64-byte scoop together with a
//!   32-byte generation signature and returns a single 64-bit quality word
//!
//! Shabal processes 512-bit message blocks against a 44-word internal state
//! (A: 12 words, B: 16 words, C: 16 words) plus a 64-bit block counter W.
//! Plot generation drives the compression directly with prepared message
//! blocks, so both entry points here take terminator blocks as 16-word
//! arrays rather than applying standard Shabal padding.
//!
//! All input bytes are copied into aligned word buffers before compression;
//! the byte stream is interpreted as little-endian 32-bit words.

mod shabal256;
mod shabal256_lite;

pub use shabal256::{shabal256, A_INIT, B_INIT, C_INIT};
pub use shabal256_lite::shabal256_lite;

/// Number of 32-bit words in one Shabal message block.
pub const MESSAGE_SIZE: usize = 16;

/// Size of a Shabal-256 digest in bytes.
pub const HASH_SIZE: usize = 32;
