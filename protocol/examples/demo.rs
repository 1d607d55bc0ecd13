//! Terminal walkthrough of a transaction's life in TXGATE.
//!
//! Funds a sender, submits a transfer through the service, resolves it from
//! the pending pool, mines it into a block, and resolves it again through
//! the transaction index. Prints the display record and the balance effects
//! at each step.
//!
//! Run with:
//!   cargo run --example demo --release

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use txgate_protocol::config::{ServiceConfig, COIN};
use txgate_protocol::crypto::keys::KeyPair;
use txgate_protocol::identity::RegId;
use txgate_protocol::mempool::Mempool;
use txgate_protocol::service::{ServicePorts, TxService};
use txgate_protocol::storage::{Account, Block, BlockFiles, Chain, IndexedBlockStore, LedgerDb};
use txgate_protocol::transaction::types::TxBody;
use txgate_protocol::transaction::TransactionBuilder;
use txgate_protocol::wallet::Keystore;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";

fn section(title: &str) {
    println!();
    println!("{BOLD}{CYAN}== {title} =={RESET}");
}

fn show<T: serde::Serialize>(label: &str, value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{DIM}{label}:{RESET}");
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();
    let dir = tempfile::tempdir()?;

    section("Storage");
    let db = Arc::new(LedgerDb::open_temporary()?);
    let blocks = Arc::new(IndexedBlockStore::new(
        Arc::clone(&db),
        BlockFiles::open(dir.path())?,
    ));
    let pool = Arc::new(Mempool::default());
    let keystore = Arc::new(Keystore::new(Arc::clone(&pool)));
    println!("ledger db and block files at {}", dir.path().display());

    section("Accounts");
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();
    let alice_id = RegId::new(1, 0);
    db.put_account(&Account::registered(alice.public_key(), alice_id, 25 * COIN))?;
    db.put_account(&Account::registered(bob.public_key(), RegId::new(1, 1), 0))?;
    keystore.import(alice.clone());
    keystore.unlock();
    println!("alice {} ({})", alice.address_hash(), alice_id);
    println!("bob   {}", bob.address_hash());

    let genesis = Block::genesis(vec![], 0);
    db.put_genesis(&genesis)?;
    let chain = Arc::new(RwLock::new(Chain::new(genesis, true)?));
    let service = TxService::new(
        ServiceConfig::default(),
        ServicePorts {
            chain: Arc::clone(&chain),
            accounts: db.clone(),
            blocks: blocks.clone(),
            pool: pool.clone(),
            outputs: db.clone(),
            wallet: keystore,
        },
    );

    section("Submit");
    let tx = TransactionBuilder::new(
        alice.public_key().into(),
        TxBody::CoinTransfer {
            to_uid: bob.address_hash().into(),
            amount: 3 * COIN,
            memo: b"rent".to_vec(),
        },
    )
    .build();
    let txid = service.submit_tx(tx)?;
    println!("{GREEN}committed{RESET} {txid} (pool size {})", pool.size());

    section("Resolve while pending");
    if let Some(detail) = service.tx_detail(&txid)? {
        show("detail", &detail)?;
    }

    section("Mine");
    let pending = pool.select_transactions(100);
    let parent = chain.read().tip().clone();
    let block = Block::new(&parent, pending, parent.time + 1);
    blocks.append_block(&block)?;
    pool.remove_batch(&[txid]);
    chain.write().set_tip(block.header.clone());
    println!("block {} at height {}", block.hash_hex(), block.height());

    section("Resolve through the index");
    if let Some(detail) = service.tx_detail(&txid)? {
        show("detail", &detail)?;
    }
    show("effects", &service.tx_address_detail(&txid)?)?;

    println!();
    println!("{DIM}done in {:?}{RESET}", started.elapsed());
    Ok(())
}
