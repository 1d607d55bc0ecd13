//! # Account & Contract-Output Records
//!
//! The persisted shapes behind the account and contract-output ports.
//! Balances here are whatever the ledger last wrote; this crate reads them
//! for the fee guard and never computes them.

use serde::{Deserialize, Serialize};

use crate::crypto::keys::PublicKey;
use crate::identity::{AddressHash, RegId};
use crate::transaction::types::CoinAmount;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A ledger account.
///
/// An account exists as soon as it has received coins, but it can only send
/// once it is *registered*: the chain has assigned it a [`RegId`] and
/// recorded its public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: AddressHash,
    pub reg_id: Option<RegId>,
    pub public_key: Option<PublicKey>,
    /// Spendable native-coin balance, in smallest units.
    pub free_balance: u64,
}

impl Account {
    /// An unregistered account holding `free_balance`.
    pub fn new(address: AddressHash, free_balance: u64) -> Self {
        Self {
            address,
            reg_id: None,
            public_key: None,
            free_balance,
        }
    }

    /// A registered account for `public_key` under `reg_id`.
    pub fn registered(public_key: PublicKey, reg_id: RegId, free_balance: u64) -> Self {
        Self {
            address: public_key.address_hash(),
            reg_id: Some(reg_id),
            public_key: Some(public_key),
            free_balance,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.reg_id.is_some() && self.public_key.is_some()
    }
}

// ---------------------------------------------------------------------------
// VmOperate
// ---------------------------------------------------------------------------

/// Which account a contract output touches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputAccount {
    RegId(RegId),
    /// A Base58Check address, kept as the contract wrote it.
    Base58(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputOp {
    AddCoin,
    MinusCoin,
}

/// One balance operation emitted by a contract invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmOperate {
    pub account: OutputAccount,
    pub op: OutputOp,
    /// Smallest units.
    pub amount: u64,
    /// Height until which the credited coins stay frozen; 0 means none.
    pub timeout_height: u64,
}

impl VmOperate {
    pub fn add(account: OutputAccount, amount: u64) -> Self {
        Self {
            account,
            op: OutputOp::AddCoin,
            amount,
            timeout_height: 0,
        }
    }

    pub fn minus(account: OutputAccount, amount: u64) -> Self {
        Self {
            account,
            op: OutputOp::MinusCoin,
            amount,
            timeout_height: 0,
        }
    }

    pub fn frozen_until(mut self, height: u64) -> Self {
        self.timeout_height = height;
        self
    }

    /// Signed amount: positive for credits, negative for debits.
    pub fn signed_amount(&self) -> CoinAmount {
        let amount = CoinAmount::from_units(self.amount);
        match self.op {
            OutputOp::AddCoin => amount,
            OutputOp::MinusCoin => amount.negated(),
        }
    }
}
