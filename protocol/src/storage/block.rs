//! # Block Structure
//!
//! Just enough block to serve lookups: a header that links to its parent and
//! commits to its transactions, plus the ordered transaction list. Producing
//! and validating blocks is someone else's problem. This crate only needs to
//! read them back and confirm the genesis block is intact at startup.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  BlockHeader                                │
//! │  ├── height: u64                            │
//! │  ├── prev_hash: [u8; 32]                    │
//! │  ├── time: u64            (unix seconds)    │
//! │  ├── merkle_root: [u8; 32] (over txids)     │
//! │  └── hash: [u8; 32]       (BLAKE3 of above) │
//! ├─────────────────────────────────────────────┤
//! │  transactions: Vec<Transaction>             │
//! └─────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::hash::{blake3_hash_multi, merkle_root};
use crate::transaction::types::TxId;
use crate::transaction::Transaction;

/// Integrity failures found by [`Block::verify`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("block {height} hash mismatch: stored={stored}, computed={computed}")]
    HashMismatch {
        height: u64,
        stored: String,
        computed: String,
    },

    #[error("block {height} merkle root mismatch: stored={stored}, computed={computed}")]
    MerkleMismatch {
        height: u64,
        stored: String,
        computed: String,
    },

    #[error("genesis block must have height 0 and a zeroed prev_hash")]
    MalformedGenesis,
}

// ---------------------------------------------------------------------------
// BlockHeader
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub prev_hash: [u8; 32],
    /// Unix timestamp, seconds.
    pub time: u64,
    pub merkle_root: [u8; 32],
    /// BLAKE3 over the fields above.
    pub hash: [u8; 32],
}

impl BlockHeader {
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn compute_hash(&self) -> [u8; 32] {
        compute_header_hash(self.height, &self.prev_hash, self.time, &self.merkle_root)
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Build the genesis block from its (usually reward) transactions.
    pub fn genesis(transactions: Vec<Transaction>, time: u64) -> Self {
        Self::assemble(0, [0u8; 32], time, transactions)
    }

    /// Build a block on top of `parent`.
    pub fn new(parent: &BlockHeader, transactions: Vec<Transaction>, time: u64) -> Self {
        Self::assemble(parent.height + 1, parent.hash, time, transactions)
    }

    fn assemble(height: u64, prev_hash: [u8; 32], time: u64, transactions: Vec<Transaction>) -> Self {
        let merkle_root = compute_merkle_root(&transactions);
        let hash = compute_header_hash(height, &prev_hash, time, &merkle_root);
        Block {
            header: BlockHeader {
                height,
                prev_hash,
                time,
                merkle_root,
                hash,
            },
            transactions,
        }
    }

    /// Check the stored hash and merkle root against the contents.
    pub fn verify(&self) -> Result<(), BlockError> {
        let computed = self.header.compute_hash();
        if self.header.hash != computed {
            return Err(BlockError::HashMismatch {
                height: self.header.height,
                stored: hex::encode(self.header.hash),
                computed: hex::encode(computed),
            });
        }

        let computed = compute_merkle_root(&self.transactions);
        if self.header.merkle_root != computed {
            return Err(BlockError::MerkleMismatch {
                height: self.header.height,
                stored: hex::encode(self.header.merkle_root),
                computed: hex::encode(computed),
            });
        }

        Ok(())
    }

    /// [`verify`](Self::verify) plus the genesis shape.
    pub fn verify_genesis(&self) -> Result<(), BlockError> {
        if self.header.height != 0 || self.header.prev_hash != [0u8; 32] {
            return Err(BlockError::MalformedGenesis);
        }
        self.verify()
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn hash_hex(&self) -> String {
        self.header.hash_hex()
    }

    /// Position and contents of the transaction with `txid`, if present.
    pub fn find_tx(&self, txid: &TxId) -> Option<(usize, &Transaction)> {
        self.transactions
            .iter()
            .enumerate()
            .find(|(_, tx)| tx.txid() == *txid)
    }
}

// ---------------------------------------------------------------------------
// Hash Computation
// ---------------------------------------------------------------------------

fn compute_header_hash(height: u64, prev_hash: &[u8; 32], time: u64, merkle: &[u8; 32]) -> [u8; 32] {
    blake3_hash_multi(&[&height.to_le_bytes(), prev_hash, &time.to_le_bytes(), merkle])
}

/// Merkle root over the block's transaction ids.
pub fn compute_merkle_root(transactions: &[Transaction]) -> [u8; 32] {
    let leaves: Vec<[u8; 32]> = transactions.iter().map(|tx| *tx.txid().as_bytes()).collect();
    merkle_root(&leaves)
}
