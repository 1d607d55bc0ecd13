//! # Keystore
//!
//! Holds Ed25519 signing keys indexed by the [`AddressHash`] they control.
//!
//! ## Lock Model
//!
//! A keystore starts locked. While locked, [`Keystore::has_key`] still
//! answers (the address set is not secret) but every [`Wallet::sign`] call
//! fails with [`WalletError::Locked`]. Unlocking is a plain flag here;
//! passphrase handling belongs to whoever constructs the keystore.
//!
//! ## Commit Path
//!
//! [`Wallet::commit`] inserts into the shared [`Mempool`]. A rejection's
//! `Display` text becomes the reason the caller sees.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::crypto::keys::{KeyPair, Signature};
use crate::error::WalletError;
use crate::identity::AddressHash;
use crate::mempool::Mempool;
use crate::ports::Wallet;
use crate::transaction::types::TxId;
use crate::transaction::Transaction;

pub struct Keystore {
    keys: RwLock<HashMap<AddressHash, KeyPair>>,
    unlocked: RwLock<bool>,
    pool: Arc<Mempool>,
}

impl Keystore {
    /// An empty, locked keystore committing into `pool`.
    pub fn new(pool: Arc<Mempool>) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            unlocked: RwLock::new(false),
            pool,
        }
    }

    /// Add a key and return the address it controls. Re-importing the same
    /// key is a no-op.
    pub fn import(&self, key: KeyPair) -> AddressHash {
        let address = key.address_hash();
        self.keys.write().insert(address, key);
        address
    }

    /// Generate a fresh key, store it, and return its address.
    pub fn generate(&self) -> AddressHash {
        self.import(KeyPair::generate())
    }

    pub fn unlock(&self) {
        *self.unlocked.write() = true;
    }

    pub fn lock(&self) {
        *self.unlocked.write() = false;
    }

    pub fn addresses(&self) -> Vec<AddressHash> {
        let mut out: Vec<AddressHash> = self.keys.read().keys().copied().collect();
        out.sort();
        out
    }

    pub fn key_count(&self) -> usize {
        self.keys.read().len()
    }

    pub fn pool(&self) -> &Arc<Mempool> {
        &self.pool
    }
}

impl std::fmt::Debug for Keystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keystore")
            .field("keys", &self.key_count())
            .field("unlocked", &*self.unlocked.read())
            .finish()
    }
}

impl Wallet for Keystore {
    fn is_unlocked(&self) -> bool {
        *self.unlocked.read()
    }

    fn has_key(&self, address: &AddressHash) -> bool {
        self.keys.read().contains_key(address)
    }

    fn sign(&self, address: &AddressHash, hash: &[u8; 32]) -> Result<Signature, WalletError> {
        if !self.is_unlocked() {
            return Err(WalletError::Locked);
        }
        let keys = self.keys.read();
        let key = keys
            .get(address)
            .ok_or_else(|| WalletError::KeyNotFound(address.to_address()))?;
        Ok(key.sign(hash))
    }

    fn commit(&self, tx: Transaction) -> Result<TxId, String> {
        let txid = self.pool.add(tx).map_err(|e| e.to_string())?;
        debug!(%txid, pool_size = self.pool.size(), "transaction entered pending pool");
        Ok(txid)
    }
}
