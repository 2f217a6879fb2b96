//! # pocx-wallet
//!
//! Key storage and block signing for PoCX forging.
//!
//! The wallet holds secp256k1 keys indexed by their account id (HASH160 of
//! the compressed public key) and produces the 65-byte recoverable compact
//! signature the block header carries. The consensus layer never touches
//! secret keys; it only recovers public keys from signatures.

mod error;
mod keystore;

pub use error::{WalletError, WalletResult};
pub use keystore::{BlockSigner, KeyStore};
