//! Priority-ordered pending pool.
//!
//! Thread-safe pool for signed transactions that have been committed but not
//! yet included in a block. The locator's last tier reads from here.
//! Transactions are indexed by [`TxId`] for O(1) lookups and sorted by fee
//! in a B-tree so block producers can take the best-paying ones first.
//!
//! ## Design
//!
//! - `DashMap` provides concurrent reads for the hot path (RPC lookups,
//!   duplicate detection on commit).
//! - `parking_lot::RwLock<BTreeMap>` protects the fee index. Writers are rare
//!   compared to readers.
//! - When full, the lowest-fee transaction is evicted, but only for an
//!   incoming transaction that pays strictly more.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use thiserror::Error;

use crate::identity::UserId;
use crate::ports::PendingPool;
use crate::transaction::types::TxId;
use crate::transaction::verification::{verify_structure, TransactionError};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable parameters for pool behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolConfig {
    /// Maximum number of transactions the pool will hold.
    pub max_size: usize,

    /// Maximum pending transactions allowed per sender.
    pub max_per_sender: usize,

    /// Seconds after which a transaction is eligible for
    /// [`Mempool::expire_old`].
    pub expiry_seconds: u64,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            max_per_sender: 100,
            expiry_seconds: 3600,
        }
    }
}

// ---------------------------------------------------------------------------
// FeeKey: B-tree ordering key
// ---------------------------------------------------------------------------

/// Composite key for the fee-priority index: fee descending, then earliest
/// first, then txid for uniqueness.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FeeKey {
    /// `u64::MAX - fee`, so ascending order is highest-fee-first.
    inverted_fee: u64,
    added_at: u64,
    txid: TxId,
}

impl Ord for FeeKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inverted_fee
            .cmp(&other.inverted_fee)
            .then_with(|| self.added_at.cmp(&other.added_at))
            .then_with(|| self.txid.cmp(&other.txid))
    }
}

impl PartialOrd for FeeKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// MempoolEntry
// ---------------------------------------------------------------------------

/// A transaction together with pool-management metadata.
#[derive(Debug, Clone)]
pub struct MempoolEntry {
    pub transaction: Transaction,
    /// Unix seconds when the transaction entered the pool.
    pub added_at: u64,
}

impl MempoolEntry {
    fn fee_key(&self, txid: TxId) -> FeeKey {
        FeeKey {
            inverted_fee: u64::MAX - self.transaction.fee,
            added_at: self.added_at,
            txid,
        }
    }
}

// ---------------------------------------------------------------------------
// MempoolError
// ---------------------------------------------------------------------------

/// Why the pool refused a transaction. The `Display` text is what callers
/// of the commit path see.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction already exists in mempool")]
    DuplicateTransaction,

    #[error("transaction is unsigned")]
    Unsigned,

    #[error("invalid transaction: {0}")]
    Invalid(#[from] TransactionError),

    #[error("sender {sender} exceeded per-sender limit of {limit}")]
    SenderLimitExceeded { sender: String, limit: usize },

    #[error("mempool is full ({size} transactions)")]
    MempoolFull { size: usize },
}

// ---------------------------------------------------------------------------
// Mempool
// ---------------------------------------------------------------------------

/// A thread-safe pending-transaction pool.
pub struct Mempool {
    transactions: DashMap<TxId, MempoolEntry>,
    fee_index: RwLock<BTreeMap<FeeKey, TxId>>,
    sender_counts: DashMap<UserId, usize>,
    config: MempoolConfig,
}

impl fmt::Debug for Mempool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mempool")
            .field("size", &self.transactions.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Mempool {
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            transactions: DashMap::new(),
            fee_index: RwLock::new(BTreeMap::new()),
            sender_counts: DashMap::new(),
            config,
        }
    }

    /// Admit a signed transaction.
    ///
    /// Checks, in order:
    ///
    /// 1. **Duplicate**: same txid already pending.
    /// 2. **Signed & well formed**: a signature is attached and
    ///    [`verify_structure`] passes.
    /// 3. **Per-sender limit**.
    /// 4. **Capacity**: when full, evict the lowest fee if the incoming
    ///    transaction pays more; otherwise reject.
    pub fn add(&self, tx: Transaction) -> Result<TxId, MempoolError> {
        let txid = tx.txid();

        if self.transactions.contains_key(&txid) {
            return Err(MempoolError::DuplicateTransaction);
        }

        if !tx.is_signed() {
            return Err(MempoolError::Unsigned);
        }
        verify_structure(&tx)?;

        let sender = tx.tx_uid;
        let sender_count = self.sender_counts.get(&sender).map(|v| *v).unwrap_or(0);
        if sender_count >= self.config.max_per_sender {
            return Err(MempoolError::SenderLimitExceeded {
                sender: sender.to_string(),
                limit: self.config.max_per_sender,
            });
        }

        if self.transactions.len() >= self.config.max_size && !self.try_evict_lowest(tx.fee) {
            return Err(MempoolError::MempoolFull {
                size: self.config.max_size,
            });
        }

        let entry = MempoolEntry {
            transaction: tx,
            added_at: current_timestamp_secs(),
        };
        let fee_key = entry.fee_key(txid);

        self.transactions.insert(txid, entry);
        self.fee_index.write().insert(fee_key, txid);
        *self.sender_counts.entry(sender).or_insert(0) += 1;

        Ok(txid)
    }

    /// Removes a transaction by id and returns it.
    pub fn remove(&self, txid: &TxId) -> Option<Transaction> {
        let (_, entry) = self.transactions.remove(txid)?;
        self.remove_from_indices(txid, &entry);
        Some(entry.transaction)
    }

    /// Batch-removes transactions, typically the ones a new block included.
    /// Missing ids are ignored.
    pub fn remove_batch(&self, txids: &[TxId]) {
        for id in txids {
            self.remove(id);
        }
    }

    pub fn get(&self, txid: &TxId) -> Option<Transaction> {
        self.transactions.get(txid).map(|e| e.transaction.clone())
    }

    pub fn contains(&self, txid: &TxId) -> bool {
        self.transactions.contains_key(txid)
    }

    /// Up to `max_count` transactions, highest fee first.
    pub fn select_transactions(&self, max_count: usize) -> Vec<Transaction> {
        let index = self.fee_index.read();
        let mut result = Vec::with_capacity(max_count.min(index.len()));

        for txid in index.values() {
            if result.len() >= max_count {
                break;
            }
            if let Some(entry) = self.transactions.get(txid) {
                result.push(entry.transaction.clone());
            }
        }

        result
    }

    pub fn size(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn clear(&self) {
        self.transactions.clear();
        self.fee_index.write().clear();
        self.sender_counts.clear();
    }

    /// Drop transactions older than `config.expiry_seconds`. Returns how
    /// many went.
    pub fn expire_old(&self) -> usize {
        self.expire_before(current_timestamp_secs().saturating_sub(self.config.expiry_seconds))
    }

    fn expire_before(&self, cutoff: u64) -> usize {
        // Collect first; never mutate while holding a DashMap iterator.
        let expired: Vec<TxId> = self
            .transactions
            .iter()
            .filter(|entry| entry.value().added_at < cutoff)
            .map(|entry| *entry.key())
            .collect();

        for id in &expired {
            self.remove(id);
        }
        expired.len()
    }

    pub fn pending_for_sender(&self, sender: &UserId) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|entry| entry.value().transaction.tx_uid == *sender)
            .map(|entry| entry.value().transaction.clone())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn try_evict_lowest(&self, incoming_fee: u64) -> bool {
        let mut index = self.fee_index.write();

        // Highest inverted fee = lowest actual fee.
        let lowest_key = match index.keys().next_back() {
            Some(k) => k.clone(),
            None => return false,
        };

        if incoming_fee <= u64::MAX - lowest_key.inverted_fee {
            return false;
        }

        let Some(evicted) = index.remove(&lowest_key) else {
            return false;
        };
        drop(index);

        if let Some((_, entry)) = self.transactions.remove(&evicted) {
            self.decrement_sender_count(&entry.transaction.tx_uid);
        }
        true
    }

    fn remove_from_indices(&self, txid: &TxId, entry: &MempoolEntry) {
        self.fee_index.write().remove(&entry.fee_key(*txid));
        self.decrement_sender_count(&entry.transaction.tx_uid);
    }

    fn decrement_sender_count(&self, sender: &UserId) {
        if let Some(mut count) = self.sender_counts.get_mut(sender) {
            if *count <= 1 {
                drop(count);
                self.sender_counts.remove(sender);
            } else {
                *count -= 1;
            }
        }
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new(MempoolConfig::default())
    }
}

impl PendingPool for Mempool {
    fn lookup(&self, txid: &TxId) -> Option<Transaction> {
        self.get(txid)
    }
}

fn current_timestamp_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
