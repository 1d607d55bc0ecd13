//! In-memory view of the active chain: the genesis block, the current tip,
//! and whether the transaction index is on.
//!
//! Shared as `Arc<RwLock<Chain>>`. Readers (the locator) hold the read guard
//! for a whole resolution; tip changes take the write guard.

use super::block::{Block, BlockError, BlockHeader};
use crate::ports::ChainState;

#[derive(Debug, Clone)]
pub struct Chain {
    genesis: Block,
    tip: BlockHeader,
    tx_index: bool,
}

impl Chain {
    /// Start a chain at `genesis`, which must pass its integrity check.
    pub fn new(genesis: Block, tx_index: bool) -> Result<Self, BlockError> {
        genesis.verify_genesis()?;
        Ok(Self {
            tip: genesis.header.clone(),
            genesis,
            tx_index,
        })
    }

    /// Move the tip forward (or sideways, on a reorganization).
    pub fn set_tip(&mut self, header: BlockHeader) {
        self.tip = header;
    }

    pub fn tip(&self) -> &BlockHeader {
        &self.tip
    }

    pub fn set_tx_index(&mut self, enabled: bool) {
        self.tx_index = enabled;
    }
}

impl ChainState for Chain {
    fn genesis_block(&self) -> &Block {
        &self.genesis
    }

    fn current_height(&self) -> u64 {
        self.tip.height
    }

    fn tx_index_enabled(&self) -> bool {
        self.tx_index
    }
}
