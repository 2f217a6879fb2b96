//! In-memory key store with compact block signing.

use crate::{WalletError, WalletResult};
use parking_lot::RwLock;
use pocx_consensus::AccountId;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Signing interface the block assembler drives.
///
/// Keyed by account id so callers resolve the effective signer first and
/// then ask whether the wallet can act for it.
pub trait BlockSigner: Send + Sync {
    /// Whether a key for `account` is present (locked or not).
    fn has_key(&self, account: &AccountId) -> bool;

    /// Compressed public key for `account`.
    fn pubkey(&self, account: &AccountId) -> WalletResult<[u8; 33]>;

    /// 65-byte recoverable compact signature over `hash`.
    fn sign_compact(&self, account: &AccountId, hash: &[u8; 32]) -> WalletResult<[u8; 65]>;
}

struct KeyEntry {
    secret: SecretKey,
    pubkey: [u8; 33],
}

/// Key store holding plain secp256k1 keys, indexed by account id.
pub struct KeyStore {
    secp: Secp256k1<All>,
    keys: RwLock<HashMap<AccountId, KeyEntry>>,
    locked: AtomicBool,
}

impl KeyStore {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
            keys: RwLock::new(HashMap::new()),
            locked: AtomicBool::new(false),
        }
    }

    /// Import a 32-byte secret key; returns the derived account id.
    pub fn import_secret(&self, secret_bytes: &[u8; 32]) -> WalletResult<AccountId> {
        let secret = SecretKey::from_slice(secret_bytes)
            .map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        Ok(self.insert(secret))
    }

    /// Generate a fresh random key; returns its account id.
    pub fn generate_key(&self) -> AccountId {
        let (secret, _) = self.secp.generate_keypair(&mut rand::thread_rng());
        self.insert(secret)
    }

    fn insert(&self, secret: SecretKey) -> AccountId {
        let pubkey = PublicKey::from_secret_key(&self.secp, &secret).serialize();
        let account = AccountId::from_pubkey(&pubkey);
        self.keys
            .write()
            .insert(account, KeyEntry { secret, pubkey });
        debug!(account = %account, "key imported");
        account
    }

    /// Lock the wallet; signing fails until unlocked.
    pub fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
        info!("wallet locked");
    }

    pub fn unlock(&self) {
        self.locked.store(false, Ordering::SeqCst);
        info!("wallet unlocked");
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Account ids of all stored keys.
    pub fn accounts(&self) -> Vec<AccountId> {
        self.keys.read().keys().copied().collect()
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockSigner for KeyStore {
    fn has_key(&self, account: &AccountId) -> bool {
        self.keys.read().contains_key(account)
    }

    fn pubkey(&self, account: &AccountId) -> WalletResult<[u8; 33]> {
        self.keys
            .read()
            .get(account)
            .map(|entry| entry.pubkey)
            .ok_or_else(|| WalletError::KeyNotFound(account.to_hex()))
    }

    fn sign_compact(&self, account: &AccountId, hash: &[u8; 32]) -> WalletResult<[u8; 65]> {
        if self.is_locked() {
            return Err(WalletError::Locked);
        }
        let keys = self.keys.read();
        let entry = keys
            .get(account)
            .ok_or_else(|| WalletError::KeyNotFound(account.to_hex()))?;

        let message = Message::from_digest(*hash);
        let signature = self.secp.sign_ecdsa_recoverable(&message, &entry.secret);
        let (rec_id, data) = signature.serialize_compact();

        // Bitcoin compact layout: 27 + recovery id, +4 for compressed keys.
        let mut out = [0u8; 65];
        out[0] = 27 + i32::from(rec_id) as u8 + 4;
        out[1..].copy_from_slice(&data);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocx_consensus::{recover_compact, BlockHash};

    #[test]
    fn import_derives_account_id() {
        let store = KeyStore::new();
        let account = store.import_secret(&[0x42; 32]).unwrap();

        assert!(store.has_key(&account));
        let pubkey = store.pubkey(&account).unwrap();
        assert_eq!(AccountId::from_pubkey(&pubkey), account);
    }

    #[test]
    fn invalid_secret_is_rejected() {
        let store = KeyStore::new();
        // Zero is outside the valid scalar range.
        assert!(store.import_secret(&[0u8; 32]).is_err());
    }

    #[test]
    fn signature_recovers_to_stored_pubkey() {
        let store = KeyStore::new();
        let account = store.import_secret(&[0x42; 32]).unwrap();

        let hash = pocx_consensus::block_signature_hash(&BlockHash([7; 32]));
        let signature = store.sign_compact(&account, &hash).unwrap();

        let recovered = recover_compact(&hash, &signature).unwrap();
        assert_eq!(recovered, store.pubkey(&account).unwrap());
    }

    #[test]
    fn locked_wallet_refuses_to_sign() {
        let store = KeyStore::new();
        let account = store.import_secret(&[0x42; 32]).unwrap();
        store.lock();

        assert!(store.has_key(&account), "lock hides nothing");
        assert!(matches!(
            store.sign_compact(&account, &[1; 32]),
            Err(WalletError::Locked)
        ));

        store.unlock();
        assert!(store.sign_compact(&account, &[1; 32]).is_ok());
    }

    #[test]
    fn unknown_account_errors() {
        let store = KeyStore::new();
        let ghost = AccountId([9; 20]);
        assert!(!store.has_key(&ghost));
        assert!(matches!(
            store.sign_compact(&ghost, &[1; 32]),
            Err(WalletError::KeyNotFound(_))
        ));
    }

    #[test]
    fn generated_keys_are_distinct() {
        let store = KeyStore::new();
        let a = store.generate_key();
        let b = store.generate_key();
        assert_ne!(a, b);
        assert_eq!(store.accounts().len(), 2);
    }
}
