//! # Ports
//!
//! The service never touches a database, a block file, or a key directly.
//! It talks to these traits, and the node wires in whatever implements
//! them. The `storage`, `mempool`, and `wallet` modules ship reference
//! implementations; consensus-grade ones live elsewhere.

use crate::crypto::keys::Signature;
use crate::error::{StoreError, WalletError};
use crate::identity::{AddressHash, RegId, UserId};
use crate::storage::block::{Block, BlockHeader};
use crate::storage::block_file::DiskTxPos;
use crate::storage::state::{Account, VmOperate};
use crate::transaction::types::TxId;
use crate::transaction::Transaction;

/// Account lookups by any form of [`UserId`].
pub trait AccountStore: Send + Sync {
    fn account(&self, id: &UserId) -> Result<Option<Account>, StoreError>;

    /// Canonical address hash for `id`. Public keys and key ids resolve
    /// without a lookup; registered ids need the store.
    fn address_hash(&self, id: &UserId) -> Result<Option<AddressHash>, StoreError> {
        if let Some(hash) = id.direct_address() {
            return Ok(Some(hash));
        }
        Ok(self.account(id)?.map(|a| a.address))
    }

    fn reg_id(&self, id: &UserId) -> Result<Option<RegId>, StoreError> {
        if let UserId::RegId(reg_id) = id {
            return Ok(Some(*reg_id));
        }
        Ok(self.account(id)?.and_then(|a| a.reg_id))
    }
}

/// Signing keys plus the path into the broadcast pipeline.
pub trait Wallet: Send + Sync {
    fn is_unlocked(&self) -> bool;

    fn has_key(&self, address: &AddressHash) -> bool;

    fn sign(&self, address: &AddressHash, hash: &[u8; 32]) -> Result<Signature, WalletError>;

    /// Hand a signed transaction to the commit path. The `Err` string is the
    /// commit path's rejection reason, reported to the caller unchanged.
    fn commit(&self, tx: Transaction) -> Result<TxId, String>;
}

/// Read-only view of the active chain.
pub trait ChainState: Send + Sync {
    fn genesis_block(&self) -> &Block;

    fn current_height(&self) -> u64;

    fn tx_index_enabled(&self) -> bool;
}

/// Indexed on-disk block storage.
pub trait BlockStore: Send + Sync {
    fn index_position(&self, txid: &TxId) -> Result<Option<DiskTxPos>, StoreError>;

    fn read_tx_at(&self, pos: &DiskTxPos) -> Result<(BlockHeader, Transaction), StoreError>;
}

/// Transactions accepted but not yet in a block.
pub trait PendingPool: Send + Sync {
    fn lookup(&self, txid: &TxId) -> Option<Transaction>;
}

/// Balance operations recorded by contract execution, keyed by the invoking
/// transaction.
pub trait ContractOutputStore: Send + Sync {
    fn outputs_for(&self, txid: &TxId) -> Result<Vec<VmOperate>, StoreError>;
}
