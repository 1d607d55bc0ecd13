//! Indexed block storage: block files for the bytes, [`LedgerDb`] for the
//! `txid -> DiskTxPos` index.

use std::sync::Arc;

use super::block::{Block, BlockHeader};
use super::block_file::{BlockFiles, DiskTxPos};
use super::db::LedgerDb;
use crate::error::StoreError;
use crate::ports::BlockStore;
use crate::transaction::types::TxId;
use crate::transaction::Transaction;

#[derive(Debug)]
pub struct IndexedBlockStore {
    db: Arc<LedgerDb>,
    files: BlockFiles,
}

impl IndexedBlockStore {
    pub fn new(db: Arc<LedgerDb>, files: BlockFiles) -> Self {
        Self { db, files }
    }

    /// Write `block` to the block files and index each of its transactions.
    /// Also records the block as the stored tip.
    pub fn append_block(&self, block: &Block) -> Result<Vec<DiskTxPos>, StoreError> {
        let positions = self.files.append_block(block)?;
        self.db.index_block(block, &positions)?;
        self.db.put_tip(&block.header)?;
        Ok(positions)
    }

    pub fn db(&self) -> &Arc<LedgerDb> {
        &self.db
    }
}

impl BlockStore for IndexedBlockStore {
    fn index_position(&self, txid: &TxId) -> Result<Option<DiskTxPos>, StoreError> {
        Ok(self.db.get_tx_position(txid)?)
    }

    fn read_tx_at(&self, pos: &DiskTxPos) -> Result<(BlockHeader, Transaction), StoreError> {
        Ok(self.files.read_tx_at(pos)?)
    }
}
