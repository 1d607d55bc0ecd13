//! # Multi-Tier Transaction Locator
//!
//! Resolves a [`TxId`] against three tiers, in strict priority order:
//!
//! ```text
//! 1. genesis block      linear scan
//! 2. indexed blocks     txid -> DiskTxPos -> block file (if indexing is on)
//! 3. pending pool       hash lookup
//! ```
//!
//! The first hit wins. A miss everywhere is `Ok(None)`. When the index
//! knows the txid but the bytes behind it cannot be read back, the result
//! is [`LocateError::CorruptIndexOrStore`]; a broken store is never
//! reported as "not found".
//!
//! The chain read guard is held across all three tiers, so a tip change
//! cannot interleave with a single resolution.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::LocateError;
use crate::ports::{BlockStore, ChainState, ContractOutputStore, PendingPool};
use crate::storage::state::VmOperate;
use crate::transaction::types::{TxBody, TxId};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// ResolvedTransaction
// ---------------------------------------------------------------------------

/// Where a resolved transaction was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum Provenance {
    /// In the genesis block. Height is always 0.
    Genesis {
        #[serde(with = "hex_hash")]
        block_hash: [u8; 32],
        time: u64,
    },
    /// In a block reached through the transaction index.
    Indexed {
        height: u64,
        #[serde(with = "hex_hash")]
        block_hash: [u8; 32],
        time: u64,
    },
    /// Committed but not yet in a block.
    Pending,
}

impl Provenance {
    /// Short tier name, used as a log field and metric label.
    pub fn tier(&self) -> &'static str {
        match self {
            Provenance::Genesis { .. } => "genesis",
            Provenance::Indexed { .. } => "indexed",
            Provenance::Pending => "pending",
        }
    }

    /// Height of the containing block, if confirmed.
    pub fn confirmed_height(&self) -> Option<u64> {
        match self {
            Provenance::Genesis { .. } => Some(0),
            Provenance::Indexed { height, .. } => Some(*height),
            Provenance::Pending => None,
        }
    }
}

/// A transaction plus everything the locator learned while finding it.
/// Only [`TxLocator`] builds these.
#[derive(Debug, Clone)]
pub struct ResolvedTransaction {
    tx: Transaction,
    provenance: Provenance,
    outputs: Vec<VmOperate>,
    raw: Vec<u8>,
}

impl ResolvedTransaction {
    pub(crate) fn new(tx: Transaction, provenance: Provenance, outputs: Vec<VmOperate>) -> Self {
        let raw = tx.raw_bytes();
        Self {
            tx,
            provenance,
            outputs,
            raw,
        }
    }

    pub fn tx(&self) -> &Transaction {
        &self.tx
    }

    pub fn txid(&self) -> TxId {
        self.tx.txid()
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Contract outputs; only populated for invocations found via the index.
    pub fn outputs(&self) -> &[VmOperate] {
        &self.outputs
    }

    /// Canonical serialized bytes, signature included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn raw_hex(&self) -> String {
        hex::encode(&self.raw)
    }
}

// ---------------------------------------------------------------------------
// TxLocator
// ---------------------------------------------------------------------------

pub struct TxLocator<C> {
    chain: Arc<RwLock<C>>,
    blocks: Arc<dyn BlockStore>,
    pool: Arc<dyn PendingPool>,
    outputs: Arc<dyn ContractOutputStore>,
}

impl<C> Clone for TxLocator<C> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
            blocks: Arc::clone(&self.blocks),
            pool: Arc::clone(&self.pool),
            outputs: Arc::clone(&self.outputs),
        }
    }
}

impl<C: ChainState> TxLocator<C> {
    pub fn new(
        chain: Arc<RwLock<C>>,
        blocks: Arc<dyn BlockStore>,
        pool: Arc<dyn PendingPool>,
        outputs: Arc<dyn ContractOutputStore>,
    ) -> Self {
        Self {
            chain,
            blocks,
            pool,
            outputs,
        }
    }

    pub fn chain(&self) -> &Arc<RwLock<C>> {
        &self.chain
    }

    /// Resolve `txid`. See the module docs for tier order.
    pub fn locate(&self, txid: &TxId) -> Result<Option<ResolvedTransaction>, LocateError> {
        let chain = self.chain.read();

        let genesis = chain.genesis_block();
        if let Some((_, tx)) = genesis.find_tx(txid) {
            debug!(%txid, tier = "genesis", "transaction located");
            return Ok(Some(ResolvedTransaction::new(
                tx.clone(),
                Provenance::Genesis {
                    block_hash: genesis.header.hash,
                    time: genesis.header.time,
                },
                Vec::new(),
            )));
        }

        if chain.tx_index_enabled() {
            if let Some(found) = self.locate_indexed(txid)? {
                debug!(%txid, tier = "indexed", "transaction located");
                return Ok(Some(found));
            }
        }

        if let Some(tx) = self.pool.lookup(txid) {
            debug!(%txid, tier = "pending", "transaction located");
            return Ok(Some(ResolvedTransaction::new(
                tx,
                Provenance::Pending,
                Vec::new(),
            )));
        }

        debug!(%txid, "transaction not found in any tier");
        Ok(None)
    }

    fn locate_indexed(&self, txid: &TxId) -> Result<Option<ResolvedTransaction>, LocateError> {
        let corrupt = |reason: String| {
            error!(%txid, %reason, "transaction index points at unreadable data");
            LocateError::CorruptIndexOrStore {
                txid: *txid,
                reason,
            }
        };

        let pos = match self.blocks.index_position(txid) {
            Ok(Some(pos)) => pos,
            Ok(None) => return Ok(None),
            Err(e) => return Err(corrupt(e.to_string())),
        };

        let (header, tx) = self
            .blocks
            .read_tx_at(&pos)
            .map_err(|e| corrupt(e.to_string()))?;

        if tx.txid() != *txid {
            return Err(corrupt(format!(
                "index entry {}:{}+{} holds {}",
                pos.file,
                pos.block_offset,
                pos.tx_offset,
                tx.txid()
            )));
        }

        let outputs = match tx.body {
            TxBody::ContractInvoke { .. } => self.outputs.outputs_for(txid)?,
            _ => Vec::new(),
        };

        Ok(Some(ResolvedTransaction::new(
            tx,
            Provenance::Indexed {
                height: header.height,
                block_hash: header.hash,
                time: header.time,
            },
            outputs,
        )))
    }
}

mod hex_hash {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(hash: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(hash))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
