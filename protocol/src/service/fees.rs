//! # Fee & Balance Guard
//!
//! Runs strictly before signing. Two checks, in this order:
//!
//! 1. The declared fee against the schedule minimum for the transaction's
//!    kind at the current height. A zero fee is filled in with the minimum.
//! 2. The sender's account: it must be registered and its free balance must
//!    cover the (possibly auto-filled) fee.

use tracing::debug;

use crate::config::FeeSchedule;
use crate::error::SubmitError;
use crate::identity::IdentityResolver;
use crate::storage::state::Account;
use crate::transaction::Transaction;

/// Apply the fee rule to `tx` in place.
///
/// Returns the fee that will be committed.
pub fn apply_min_fee(
    tx: &mut Transaction,
    schedule: &FeeSchedule,
    height: u64,
) -> Result<u64, SubmitError> {
    let min = schedule.min_fee(tx.kind(), height);
    if tx.fee == 0 {
        debug!(kind = %tx.kind(), min, "auto-filling fee");
        tx.fee = min;
    } else if tx.fee < min {
        return Err(SubmitError::FeeTooLow { fee: tx.fee, min });
    }
    Ok(tx.fee)
}

/// Load the sender's account and check it can pay `fee`.
pub fn check_sender(
    resolver: &IdentityResolver,
    tx: &Transaction,
    fee: u64,
) -> Result<Account, SubmitError> {
    let account = resolver
        .account(&tx.tx_uid)?
        .filter(Account::is_registered)
        .ok_or(SubmitError::AccountUnregistered)?;

    if account.free_balance < fee {
        return Err(SubmitError::InsufficientBalance {
            balance: account.free_balance,
            fee,
        });
    }
    Ok(account)
}
