//! # Signer / Committer
//!
//! Turns an unsigned transaction into a committed one:
//!
//! ```text
//! fee guard -> balance guard -> sender := RegId -> wallet unlocked?
//!   -> wallet has key? -> sign(signature_hash) -> commit
//! ```
//!
//! Every step short-circuits. A commit rejection carries the commit path's
//! own reason back to the caller unchanged, and nothing is retried.

use tracing::{info, warn};

use super::fees::{apply_min_fee, check_sender};
use crate::config::FeeSchedule;
use crate::error::SubmitError;
use crate::identity::{IdentityResolver, UserId};
use crate::ports::Wallet;
use crate::transaction::types::TxId;
use crate::transaction::Transaction;

/// Validate, sign, and commit `tx` at chain height `height`.
pub fn submit_tx(
    mut tx: Transaction,
    height: u64,
    schedule: &FeeSchedule,
    resolver: &IdentityResolver,
    wallet: &dyn Wallet,
) -> Result<TxId, SubmitError> {
    let result = sign_and_commit(&mut tx, height, schedule, resolver, wallet);
    match &result {
        Ok(txid) => info!(%txid, kind = %tx.kind(), fee = tx.fee, "transaction committed"),
        Err(e) => warn!(kind = %tx.kind(), sender = %tx.tx_uid, error = %e, reason = e.kind(), "submission rejected"),
    }
    result
}

fn sign_and_commit(
    tx: &mut Transaction,
    height: u64,
    schedule: &FeeSchedule,
    resolver: &IdentityResolver,
    wallet: &dyn Wallet,
) -> Result<TxId, SubmitError> {
    let fee = apply_min_fee(tx, schedule, height)?;
    let account = check_sender(resolver, tx, fee)?;

    // Registered accounts always carry a RegId; the compact form is what
    // gets signed and broadcast.
    let reg_id = account.reg_id.ok_or(SubmitError::AccountUnregistered)?;
    tx.tx_uid = UserId::RegId(reg_id);

    if !wallet.is_unlocked() {
        return Err(SubmitError::KeyNotUnlocked);
    }
    if !wallet.has_key(&account.address) {
        return Err(SubmitError::KeyNotFound);
    }

    let signature = wallet.sign(&account.address, &tx.signature_hash())?;
    tx.signature = Some(signature);

    wallet
        .commit(tx.clone())
        .map_err(SubmitError::CommitRejected)
}
