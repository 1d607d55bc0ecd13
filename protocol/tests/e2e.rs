//! End-to-end tests for TXGATE.
//!
//! Each test wires the full service over the reference adapters: a temporary
//! sled database, block files in a temp dir, the mempool, and a keystore
//! wallet. Transactions go in through `submit_tx` or a written block and come
//! back out through `tx_detail` and `tx_address_detail`.

use std::sync::Arc;

use parking_lot::RwLock;
use tempfile::TempDir;

use txgate_protocol::config::{ServiceConfig, COIN};
use txgate_protocol::crypto::keys::KeyPair;
use txgate_protocol::error::SubmitError;
use txgate_protocol::identity::{RegId, UserId};
use txgate_protocol::mempool::Mempool;
use txgate_protocol::service::{Direction, Provenance, ServicePorts, TxService};
use txgate_protocol::storage::{
    Account, Block, BlockFiles, Chain, IndexedBlockStore, LedgerDb, OutputAccount, VmOperate,
};
use txgate_protocol::transaction::types::{TxBody, TxId, TxKind};
use txgate_protocol::transaction::verification::verify_signature;
use txgate_protocol::transaction::{sign_transaction, Transaction, TransactionBuilder};
use txgate_protocol::wallet::Keystore;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const ALICE: RegId = RegId {
    height: 1,
    index: 0,
};
const BOB: RegId = RegId {
    height: 1,
    index: 1,
};

struct Harness {
    dir: TempDir,
    db: Arc<LedgerDb>,
    blocks: Arc<IndexedBlockStore>,
    pool: Arc<Mempool>,
    keystore: Arc<Keystore>,
    chain: Arc<RwLock<Chain>>,
    service: TxService<Chain>,
    genesis: Block,
    alice: KeyPair,
    bob: KeyPair,
}

/// Full stack with Alice (10 coins, key in the wallet) and Bob registered,
/// and a genesis block paying Alice a reward.
fn setup() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Arc::new(LedgerDb::open_temporary().expect("temp db"));
    let blocks = Arc::new(IndexedBlockStore::new(
        Arc::clone(&db),
        BlockFiles::open(dir.path()).expect("block files"),
    ));
    let pool = Arc::new(Mempool::default());
    let keystore = Arc::new(Keystore::new(Arc::clone(&pool)));

    let alice = KeyPair::from_seed(&[0xa1; 32]);
    let bob = KeyPair::from_seed(&[0xb0; 32]);
    db.put_account(&Account::registered(alice.public_key(), ALICE, 10 * COIN))
        .unwrap();
    db.put_account(&Account::registered(bob.public_key(), BOB, 0))
        .unwrap();
    keystore.import(alice.clone());
    keystore.unlock();

    let reward = TransactionBuilder::new(ALICE.into(), TxBody::BlockReward { reward: 50 * COIN })
        .build();
    let genesis = Block::genesis(vec![reward], 1_700_000_000);
    let chain = Arc::new(RwLock::new(Chain::new(genesis.clone(), true).unwrap()));

    let service = TxService::new(
        ServiceConfig::default(),
        ServicePorts {
            chain: Arc::clone(&chain),
            accounts: db.clone(),
            blocks: blocks.clone(),
            pool: pool.clone(),
            outputs: db.clone(),
            wallet: keystore.clone(),
        },
    );

    Harness {
        dir,
        db,
        blocks,
        pool,
        keystore,
        chain,
        service,
        genesis,
        alice,
        bob,
    }
}

fn transfer(from: UserId, to: UserId, amount: u64, fee: u64, memo: &[u8]) -> Transaction {
    TransactionBuilder::new(
        from,
        TxBody::CoinTransfer {
            to_uid: to,
            amount,
            memo: memo.to_vec(),
        },
    )
    .fee(fee)
    .build()
}

fn signed_by(key: &KeyPair, sender: RegId, body: TxBody, fee: u64) -> Transaction {
    let mut tx = TransactionBuilder::new(sender.into(), body).fee(fee).build();
    sign_transaction(&mut tx, key);
    tx
}

/// Writes `txs` as the next block and moves the chain tip.
fn mine(h: &Harness, txs: Vec<Transaction>) -> Block {
    let parent = h.chain.read().tip().clone();
    let block = Block::new(&parent, txs, parent.time + 10);
    h.blocks.append_block(&block).unwrap();
    let ids: Vec<TxId> = block.transactions.iter().map(Transaction::txid).collect();
    h.pool.remove_batch(&ids);
    h.chain.write().set_tip(block.header.clone());
    block
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[test]
fn zero_fee_is_committed_at_schedule_minimum() {
    let h = setup();
    let tx = transfer(ALICE.into(), BOB.into(), COIN, 0, b"");
    let txid = h.service.submit_tx(tx).unwrap();

    let resolved = h.service.locate(&txid).unwrap().expect("pending");
    assert_eq!(resolved.provenance(), &Provenance::Pending);
    let min = h
        .service
        .config()
        .fee_schedule
        .min_fee(TxKind::CoinTransfer, h.service.current_height());
    assert_eq!(resolved.tx().fee, min);
    verify_signature(resolved.tx(), &h.alice.public_key()).unwrap();
}

#[test]
fn fee_below_minimum_is_rejected_before_signing() {
    let h = setup();
    let err = h
        .service
        .submit_tx(transfer(ALICE.into(), BOB.into(), COIN, 1, b""))
        .unwrap_err();
    assert!(matches!(err, SubmitError::FeeTooLow { fee: 1, .. }));
    assert!(h.pool.is_empty());
}

#[test]
fn insufficient_balance_is_never_committed() {
    let h = setup();
    h.db.put_account(&Account::registered(h.alice.public_key(), ALICE, 5))
        .unwrap();

    let err = h
        .service
        .submit_tx(transfer(ALICE.into(), BOB.into(), 1, 0, b""))
        .unwrap_err();
    assert_eq!(err.kind(), "insufficient_balance");
    assert!(h.pool.is_empty());
}

#[test]
fn sender_without_wallet_key_is_rejected() {
    let h = setup();
    let err = h
        .service
        .submit_tx(transfer(BOB.into(), ALICE.into(), 1, 0, b""))
        .unwrap_err();
    // Bob has no balance to pay the fee, which is checked first.
    assert_eq!(err.kind(), "insufficient_balance");

    h.db.put_account(&Account::registered(h.bob.public_key(), BOB, COIN))
        .unwrap();
    let err = h
        .service
        .submit_tx(transfer(BOB.into(), ALICE.into(), 1, 0, b""))
        .unwrap_err();
    assert_eq!(err, SubmitError::KeyNotFound);
}

#[test]
fn locked_wallet_is_reported() {
    let h = setup();
    h.keystore.lock();
    let err = h
        .service
        .submit_tx(transfer(ALICE.into(), BOB.into(), 1, 0, b""))
        .unwrap_err();
    assert_eq!(err, SubmitError::KeyNotUnlocked);
}

#[test]
fn duplicate_commit_reason_is_verbatim() {
    let h = setup();
    let tx = transfer(ALICE.into(), BOB.into(), 1, 0, b"");
    h.service.submit_tx(tx.clone()).unwrap();
    let err = h.service.submit_tx(tx).unwrap_err();
    assert_eq!(
        err,
        SubmitError::CommitRejected("transaction already exists in mempool".into())
    );
}

#[test]
fn mutating_a_signed_transaction_breaks_its_signature() {
    let h = setup();
    let txid = h
        .service
        .submit_tx(transfer(ALICE.into(), BOB.into(), COIN, 0, b"x"))
        .unwrap();
    let original = h.service.locate(&txid).unwrap().unwrap().tx().clone();

    let mut bumped = original.clone();
    bumped.fee += 1;
    assert!(verify_signature(&bumped, &h.alice.public_key()).is_err());

    let mut redirected = original.clone();
    redirected.body = TxBody::CoinTransfer {
        to_uid: ALICE.into(),
        amount: COIN,
        memo: b"x".to_vec(),
    };
    assert!(verify_signature(&redirected, &h.alice.public_key()).is_err());

    let mut later = original;
    later.valid_height += 1;
    assert!(verify_signature(&later, &h.alice.public_key()).is_err());
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[test]
fn unknown_id_is_none_not_an_error() {
    let h = setup();
    let unknown = TxId::from_bytes([0xee; 32]);
    assert!(h.service.tx_detail(&unknown).unwrap().is_none());
    assert!(h.service.tx_address_detail(&unknown).unwrap().is_empty());
}

#[test]
fn genesis_beats_pending_for_the_same_id() {
    let h = setup();
    let reward = h.genesis.transactions[0].clone();
    // Force the same transaction into the pool; a signed copy is needed for
    // admission, so sign it as-is.
    let mut copy = reward.clone();
    sign_transaction(&mut copy, &h.alice);
    h.pool.add(copy.clone()).unwrap();
    assert_eq!(copy.txid(), reward.txid());

    let detail = h.service.tx_detail(&reward.txid()).unwrap().unwrap();
    assert_eq!(detail.confirmed_height, Some(0));
    assert_eq!(detail.block_hash, Some(h.genesis.hash_hex()));
}

#[test]
fn raw_bytes_decode_to_the_resolved_transaction() {
    let h = setup();
    let txid = h
        .service
        .submit_tx(transfer(ALICE.into(), BOB.into(), 7, 0, b"raw"))
        .unwrap();
    let resolved = h.service.locate(&txid).unwrap().unwrap();
    let decoded = Transaction::from_raw_bytes(resolved.raw()).unwrap();
    assert_eq!(&decoded, resolved.tx());

    let detail = h.service.tx_detail(&txid).unwrap().unwrap();
    assert_eq!(detail.rawtx, resolved.raw_hex());
}

#[test]
fn pending_transaction_becomes_indexed_after_inclusion() {
    let h = setup();
    let txid = h
        .service
        .submit_tx(transfer(ALICE.into(), BOB.into(), 7, 0, b""))
        .unwrap();
    let pending = h.service.locate(&txid).unwrap().unwrap();
    let block = mine(&h, vec![pending.tx().clone()]);

    assert!(!h.pool.contains(&txid));
    let found = h.service.locate(&txid).unwrap().unwrap();
    assert_eq!(
        found.provenance(),
        &Provenance::Indexed {
            height: 1,
            block_hash: block.header.hash,
            time: block.header.time,
        }
    );
    assert_eq!(h.service.current_height(), 1);
}

#[test]
fn disabled_index_hides_indexed_only_transactions() {
    let h = setup();
    let tx = signed_by(
        &h.alice,
        ALICE,
        TxBody::CoinTransfer {
            to_uid: BOB.into(),
            amount: 3,
            memo: vec![],
        },
        10_000,
    );
    mine(&h, vec![tx.clone()]);
    assert!(h.service.locate(&tx.txid()).unwrap().is_some());

    h.chain.write().set_tx_index(false);
    assert!(h.service.locate(&tx.txid()).unwrap().is_none());
}

#[test]
fn corrupt_block_file_is_reported_not_hidden() {
    let h = setup();
    let tx = signed_by(
        &h.alice,
        ALICE,
        TxBody::CoinTransfer {
            to_uid: BOB.into(),
            amount: 3,
            memo: vec![],
        },
        10_000,
    );
    mine(&h, vec![tx.clone()]);

    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(h.dir.path().join("blk00000.dat"))
        .unwrap();
    file.set_len(4).unwrap();

    let err = h.service.locate(&tx.txid()).unwrap_err();
    assert_eq!(err.kind(), "corrupt_index_or_store");
    assert!(h.service.tx_detail(&tx.txid()).is_err());
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

#[test]
fn transfer_effect_carries_both_parties_and_memo() {
    let h = setup();
    let txid = h
        .service
        .submit_tx(transfer(ALICE.into(), BOB.into(), 150_000_000, 0, b"hi"))
        .unwrap();

    let effects = h.service.tx_address_detail(&txid).unwrap();
    assert_eq!(effects.len(), 1);
    let e = &effects[0];
    assert_eq!(e.amount.as_coins(), 1.5);
    assert_eq!(e.address, h.alice.address_hash().to_address());
    assert_eq!(e.counterparty, Some(h.bob.address_hash().to_address()));
    assert_eq!(hex::decode(e.memo.as_deref().unwrap()).unwrap(), b"hi");
}

#[test]
fn indexed_invoke_unpacks_contract_outputs() {
    let h = setup();
    let invoke = signed_by(
        &h.alice,
        ALICE,
        TxBody::ContractInvoke {
            app_uid: BOB.into(),
            amount: COIN,
            arguments: vec![0x01, 0x02],
        },
        1_000_000,
    );
    mine(&h, vec![invoke.clone()]);
    h.db.put_contract_outputs(
        &invoke.txid(),
        &[
            VmOperate::add(OutputAccount::RegId(ALICE), 200_000_000),
            VmOperate::minus(
                OutputAccount::Base58(h.bob.address_hash().to_address()),
                50_000_000,
            )
            .frozen_until(100),
        ],
    )
    .unwrap();

    let effects = h.service.tx_address_detail(&invoke.txid()).unwrap();
    assert_eq!(effects.len(), 3);
    assert_eq!(effects[0].arguments.as_deref(), Some("0102"));
    assert_eq!(effects[1].direction, Direction::Credit);
    assert_eq!(effects[1].amount.as_coins(), 2.0);
    assert_eq!(effects[2].direction, Direction::Debit);
    assert_eq!(effects[2].amount.as_coins(), -0.5);
    assert_eq!(effects[2].freeze_height, Some(100));

    let detail = h.service.tx_detail(&invoke.txid()).unwrap().unwrap();
    assert_eq!(detail.list_output.map(|o| o.len()), Some(2));
}

#[test]
fn unsupported_kinds_have_no_effects() {
    let h = setup();
    let tx = signed_by(
        &h.alice,
        ALICE,
        TxBody::DexBuyLimitOrder {
            coin_symbol: "WUSD".into(),
            asset_symbol: "WICC".into(),
            asset_amount: 10,
            price: 1,
        },
        100_000,
    );
    h.pool.add(tx.clone()).unwrap();
    assert!(h.service.tx_detail(&tx.txid()).unwrap().is_some());
    assert!(h.service.tx_address_detail(&tx.txid()).unwrap().is_empty());
}

#[test]
fn multisig_with_unresolvable_cosigner_has_no_effects() {
    let h = setup();
    let tx = signed_by(
        &h.alice,
        ALICE,
        TxBody::MultisigTransfer {
            signers: vec![ALICE, RegId::new(404, 4)],
            required: 2,
            to_uid: BOB.into(),
            amount: 5,
            memo: vec![],
        },
        10_000,
    );
    h.pool.add(tx.clone()).unwrap();
    assert!(h.service.tx_address_detail(&tx.txid()).unwrap().is_empty());

    let resolvable = signed_by(
        &h.alice,
        ALICE,
        TxBody::MultisigTransfer {
            signers: vec![ALICE, BOB],
            required: 2,
            to_uid: BOB.into(),
            amount: 5,
            memo: vec![],
        },
        10_000,
    );
    h.pool.add(resolvable.clone()).unwrap();
    assert_eq!(
        h.service.tx_address_detail(&resolvable.txid()).unwrap().len(),
        1
    );
}

#[test]
fn genesis_reward_is_a_credit() {
    let h = setup();
    let reward = &h.genesis.transactions[0];
    let effects = h.service.tx_address_detail(&reward.txid()).unwrap();
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].direction, Direction::Credit);
    assert_eq!(effects[0].amount.as_coins(), 50.0);
}
