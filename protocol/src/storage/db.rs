//! # LedgerDb: Persistent Index & Account Store
//!
//! The sled-backed half of the storage layer. Block bodies live in block
//! files (see [`super::block_file`]); everything that needs a key lookup
//! lives here.
//!
//! ## Tree Layout
//!
//! | Tree               | Key                    | Value                      |
//! |--------------------|------------------------|----------------------------|
//! | `accounts`         | address hash (20B)     | `bincode(Account)`         |
//! | `reg_ids`          | regid wire form (6B)   | address hash (20B)         |
//! | `tx_index`         | txid (32B)             | `bincode(DiskTxPos)`       |
//! | `contract_outputs` | txid (32B)             | `bincode(Vec<VmOperate>)`  |
//! | `metadata`         | key (UTF-8)            | genesis, tip, best height  |
//!
//! Heights in `metadata` are big-endian u64, same as everywhere else sled
//! needs to sort numbers.
//!
//! ## Atomicity
//!
//! Indexing a block writes every transaction position in one `Batch`.
//! Either the whole block is findable or none of it is.

use sled::{Batch, Db, Tree};
use std::path::Path;

use super::block::{Block, BlockHeader};
use super::block_file::DiskTxPos;
use super::state::{Account, VmOperate};
use crate::error::StoreError;
use crate::identity::{AddressHash, RegId, UserId};
use crate::ports::{AccountStore, ContractOutputStore};
use crate::transaction::types::TxId;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<bincode::Error> for DbError {
    fn from(e: bincode::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Sled(inner) => StoreError::Database(inner.to_string()),
            DbError::Serialization(msg) => StoreError::Decode(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

const META_BEST_HEIGHT: &[u8] = b"best_height";
const META_GENESIS: &[u8] = b"genesis_block";
const META_TIP: &[u8] = b"tip_header";

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Persistent account, index, and contract-output storage.
///
/// sled is internally synchronized, so a `LedgerDb` can be shared across
/// threads via `Arc<LedgerDb>` without an outer lock.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    accounts: Tree,
    reg_ids: Tree,
    tx_index: Tree,
    contract_outputs: Tree,
    metadata: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory database, gone when dropped. For tests.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        Ok(Self {
            accounts: db.open_tree("accounts")?,
            reg_ids: db.open_tree("reg_ids")?,
            tx_index: db.open_tree("tx_index")?,
            contract_outputs: db.open_tree("contract_outputs")?,
            metadata: db.open_tree("metadata")?,
            db,
        })
    }

    // -- Account operations -------------------------------------------------

    /// Insert or replace an account, keeping the registered-id index in
    /// step.
    pub fn put_account(&self, account: &Account) -> DbResult<()> {
        let bytes = bincode::serialize(account)?;
        self.accounts.insert(account.address.as_bytes(), bytes)?;
        if let Some(reg_id) = account.reg_id {
            self.reg_ids
                .insert(reg_id.to_bytes(), account.address.as_bytes().as_slice())?;
        }
        Ok(())
    }

    pub fn get_account(&self, address: &AddressHash) -> DbResult<Option<Account>> {
        match self.accounts.get(address.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn address_for_reg_id(&self, reg_id: &RegId) -> DbResult<Option<AddressHash>> {
        match self.reg_ids.get(reg_id.to_bytes())? {
            Some(bytes) => {
                let hash: [u8; 20] = bytes.as_ref().try_into().map_err(|_| {
                    DbError::Serialization(format!("reg_ids entry for {reg_id} is not 20 bytes"))
                })?;
                Ok(Some(AddressHash::from_bytes(hash)))
            }
            None => Ok(None),
        }
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    // -- Transaction index --------------------------------------------------

    /// Record the position of every transaction in `block`. `positions`
    /// must line up with `block.transactions`.
    pub fn index_block(&self, block: &Block, positions: &[DiskTxPos]) -> DbResult<()> {
        if block.transactions.len() != positions.len() {
            return Err(DbError::Serialization(format!(
                "block {} has {} transactions but {} positions",
                block.header.height,
                block.transactions.len(),
                positions.len()
            )));
        }
        let mut batch = Batch::default();
        for (tx, pos) in block.transactions.iter().zip(positions) {
            batch.insert(tx.txid().as_bytes().as_slice(), bincode::serialize(pos)?);
        }
        self.tx_index.apply_batch(batch)?;
        Ok(())
    }

    pub fn put_tx_position(&self, txid: &TxId, pos: &DiskTxPos) -> DbResult<()> {
        self.tx_index
            .insert(txid.as_bytes(), bincode::serialize(pos)?)?;
        Ok(())
    }

    pub fn get_tx_position(&self, txid: &TxId) -> DbResult<Option<DiskTxPos>> {
        match self.tx_index.get(txid.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn indexed_tx_count(&self) -> usize {
        self.tx_index.len()
    }

    // -- Contract outputs ---------------------------------------------------

    pub fn put_contract_outputs(&self, txid: &TxId, outputs: &[VmOperate]) -> DbResult<()> {
        self.contract_outputs
            .insert(txid.as_bytes(), bincode::serialize(outputs)?)?;
        Ok(())
    }

    /// Outputs recorded for `txid`; empty when none were recorded.
    pub fn get_contract_outputs(&self, txid: &TxId) -> DbResult<Vec<VmOperate>> {
        match self.contract_outputs.get(txid.as_bytes())? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    // -- Metadata -----------------------------------------------------------

    pub fn get_best_height(&self) -> DbResult<Option<u64>> {
        match self.metadata.get(META_BEST_HEIGHT)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_ref()
                    .try_into()
                    .map_err(|_| DbError::Serialization("invalid height bytes".to_string()))?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    pub fn set_best_height(&self, height: u64) -> DbResult<()> {
        self.metadata.insert(META_BEST_HEIGHT, &height.to_be_bytes())?;
        Ok(())
    }

    pub fn get_genesis(&self) -> DbResult<Option<Block>> {
        match self.metadata.get(META_GENESIS)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_genesis(&self, block: &Block) -> DbResult<()> {
        self.metadata
            .insert(META_GENESIS, bincode::serialize(block)?)?;
        Ok(())
    }

    /// Header of the last appended block, so a restart resumes at the same
    /// tip.
    pub fn get_tip(&self) -> DbResult<Option<BlockHeader>> {
        match self.metadata.get(META_TIP)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_tip(&self, header: &BlockHeader) -> DbResult<()> {
        self.metadata.insert(META_TIP, bincode::serialize(header)?)?;
        self.set_best_height(header.height)
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Port implementations
// ---------------------------------------------------------------------------

impl AccountStore for LedgerDb {
    fn account(&self, id: &UserId) -> Result<Option<Account>, StoreError> {
        let address = match id {
            UserId::RegId(reg_id) => match self.address_for_reg_id(reg_id)? {
                Some(address) => address,
                None => return Ok(None),
            },
            UserId::PubKey(pk) => pk.address_hash(),
            UserId::KeyId(hash) => *hash,
        };
        Ok(self.get_account(&address)?)
    }
}

impl ContractOutputStore for LedgerDb {
    fn outputs_for(&self, txid: &TxId) -> Result<Vec<VmOperate>, StoreError> {
        Ok(self.get_contract_outputs(txid)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::KeyPair;
    use crate::storage::state::OutputAccount;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::types::TxBody;

    fn registered(seed: u8, height: u32) -> Account {
        let kp = KeyPair::from_seed(&[seed; 32]);
        Account::registered(kp.public_key(), RegId::new(height, 0), 1_000 * seed as u64)
    }

    #[test]
    fn open_temporary_database() {
        let db = LedgerDb::open_temporary().expect("should create temp db");
        assert_eq!(db.account_count(), 0);
        assert_eq!(db.indexed_tx_count(), 0);
        assert_eq!(db.get_best_height().unwrap(), None);
    }

    #[test]
    fn open_persistent_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let db = LedgerDb::open(dir.path()).expect("should open db");
            db.set_best_height(12).unwrap();
            db.flush().unwrap();
        }
        let db = LedgerDb::open(dir.path()).expect("should reopen db");
        assert_eq!(db.get_best_height().unwrap(), Some(12));
    }

    #[test]
    fn genesis_and_tip_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let genesis = Block::genesis(vec![], 7);
        let next = Block::new(&genesis.header, vec![], 8);
        {
            let db = LedgerDb::open(dir.path()).unwrap();
            assert!(db.get_tip().unwrap().is_none());
            db.put_genesis(&genesis).unwrap();
            db.put_tip(&next.header).unwrap();
            db.flush().unwrap();
        }
        let db = LedgerDb::open(dir.path()).unwrap();
        assert_eq!(db.get_genesis().unwrap(), Some(genesis));
        assert_eq!(db.get_tip().unwrap(), Some(next.header));
        assert_eq!(db.get_best_height().unwrap(), Some(1));
    }

    #[test]
    fn account_lookup_by_every_form() {
        let db = LedgerDb::open_temporary().unwrap();
        let account = registered(1, 10);
        db.put_account(&account).unwrap();

        let pk = account.public_key.unwrap();
        for id in [
            UserId::PubKey(pk),
            UserId::KeyId(account.address),
            UserId::RegId(RegId::new(10, 0)),
        ] {
            assert_eq!(db.account(&id).unwrap(), Some(account.clone()));
        }
        assert_eq!(db.account(&UserId::RegId(RegId::new(11, 0))).unwrap(), None);
    }

    #[test]
    fn unregistered_account_has_no_reg_id_entry() {
        let db = LedgerDb::open_temporary().unwrap();
        let account = Account::new(AddressHash::from_bytes([4u8; 20]), 77);
        db.put_account(&account).unwrap();
        assert_eq!(db.get_account(&account.address).unwrap(), Some(account));
        assert!(db.reg_ids.is_empty());
    }

    #[test]
    fn index_block_records_every_position() {
        let db = LedgerDb::open_temporary().unwrap();
        let txs: Vec<_> = (1..=3u64)
            .map(|n| {
                TransactionBuilder::new(RegId::new(0, 0).into(), TxBody::BlockReward { reward: n })
                    .build()
            })
            .collect();
        let block = Block::genesis(txs, 0);
        let positions: Vec<_> = (0..3u64)
            .map(|i| DiskTxPos {
                file: 0,
                block_offset: 0,
                tx_offset: i * 10,
            })
            .collect();
        db.index_block(&block, &positions).unwrap();

        for (tx, pos) in block.transactions.iter().zip(&positions) {
            assert_eq!(db.get_tx_position(&tx.txid()).unwrap(), Some(*pos));
        }
        assert_eq!(db.indexed_tx_count(), 3);
    }

    #[test]
    fn index_block_rejects_mismatched_positions() {
        let db = LedgerDb::open_temporary().unwrap();
        let block = Block::genesis(
            vec![TransactionBuilder::new(RegId::new(0, 0).into(), TxBody::BlockReward { reward: 1 })
                .build()],
            0,
        );
        assert!(db.index_block(&block, &[]).is_err());
        assert_eq!(db.indexed_tx_count(), 0);
    }

    #[test]
    fn contract_outputs_default_to_empty() {
        let db = LedgerDb::open_temporary().unwrap();
        let txid = TxId::from_bytes([9u8; 32]);
        assert!(db.outputs_for(&txid).unwrap().is_empty());

        let outputs = vec![
            VmOperate::add(OutputAccount::RegId(RegId::new(1, 1)), 5),
            VmOperate::minus(OutputAccount::Base58("Wxyz".into()), 3).frozen_until(100),
        ];
        db.put_contract_outputs(&txid, &outputs).unwrap();
        assert_eq!(db.outputs_for(&txid).unwrap(), outputs);
    }

    #[test]
    fn corrupt_account_bytes_surface_as_decode_error() {
        let db = LedgerDb::open_temporary().unwrap();
        let address = AddressHash::from_bytes([8u8; 20]);
        db.accounts.insert(address.as_bytes(), &[0xFFu8; 3][..]).unwrap();
        let err = db.account(&UserId::KeyId(address)).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn genesis_roundtrip() {
        let db = LedgerDb::open_temporary().unwrap();
        assert!(db.get_genesis().unwrap().is_none());
        let genesis = Block::genesis(vec![], 1_234);
        db.put_genesis(&genesis).unwrap();
        assert_eq!(db.get_genesis().unwrap(), Some(genesis));
    }

    #[test]
    fn concurrent_reads_do_not_block() {
        use std::sync::Arc;
        use std::thread;

        let db = Arc::new(LedgerDb::open_temporary().unwrap());
        let accounts: Vec<_> = (1..=8u8).map(|s| registered(s, s as u32)).collect();
        for a in &accounts {
            db.put_account(a).unwrap();
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                let accounts = accounts.clone();
                thread::spawn(move || {
                    for a in &accounts {
                        let got = db.account(&UserId::KeyId(a.address)).unwrap().unwrap();
                        assert_eq!(got.free_balance, a.free_balance);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("reader thread should not panic");
        }
    }
}
