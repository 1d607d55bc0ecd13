//! # Effect Projector
//!
//! Flattens a resolved transaction into address-level balance effects.
//!
//! | Kind                           | Records                                  |
//! |--------------------------------|------------------------------------------|
//! | reward                         | one credit to the sender                 |
//! | register, deploy, vote         | one debit from the sender                |
//! | coin transfer                  | one record: from, to, amount, memo       |
//! | contract invoke                | summary + one per contract output        |
//! | multisig transfer              | one record from the multisig address     |
//! | CDP, DEX, price feed, fcoin    | none                                     |
//!
//! Contract outputs come from the resolved transaction when the locator
//! attached them (indexed hits), and from the output store otherwise, so a
//! genesis or pending invoke projects the same way.
//!
//! Projection is all or nothing: if any party of a transaction cannot be
//! resolved to an address, the transaction projects to an empty list.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::locator::ResolvedTransaction;
use crate::crypto::hash::address_digest;
use crate::error::StoreError;
use crate::identity::{AddressHash, IdentityResolver, RegId, UserId};
use crate::ports::ContractOutputStore;
use crate::storage::state::{OutputAccount, OutputOp, VmOperate};
use crate::transaction::types::{CoinAmount, TxBody, TxKind};

// ---------------------------------------------------------------------------
// EffectRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

/// One normalized balance effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectRecord {
    pub tx_type: TxKind,
    /// Base58Check address of the affected account.
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    pub direction: Direction,
    /// Negative for contract-output debits.
    pub amount: CoinAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeze_height: Option<u64>,
    /// Hex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Hex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl EffectRecord {
    fn new(tx_type: TxKind, address: AddressHash, direction: Direction, amount: CoinAmount) -> Self {
        Self {
            tx_type,
            address: address.to_address(),
            counterparty: None,
            direction,
            amount,
            freeze_height: None,
            memo: None,
            arguments: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
enum UnresolvedIdentity {
    #[error("no address for {0}")]
    User(UserId),

    #[error("no registered key for co-signer {0}")]
    CoSigner(RegId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct EffectProjector {
    resolver: IdentityResolver,
    outputs: Arc<dyn ContractOutputStore>,
}

impl EffectProjector {
    pub fn new(resolver: IdentityResolver, outputs: Arc<dyn ContractOutputStore>) -> Self {
        Self { resolver, outputs }
    }

    /// Recorded outputs of an invoke, wherever it was found.
    fn outputs_of<'a>(
        &self,
        resolved: &'a ResolvedTransaction,
    ) -> Result<Cow<'a, [VmOperate]>, StoreError> {
        if resolved.outputs().is_empty() {
            Ok(Cow::Owned(self.outputs.outputs_for(&resolved.txid())?))
        } else {
            Ok(Cow::Borrowed(resolved.outputs()))
        }
    }

    /// Effects of `resolved`, or an empty list when the kind is not
    /// projected or any party fails to resolve.
    pub fn project(&self, resolved: &ResolvedTransaction) -> Vec<EffectRecord> {
        match self.try_project(resolved) {
            Ok(records) => records,
            Err(e) => {
                debug!(txid = %resolved.txid(), reason = %e, "projection degraded to no effects");
                Vec::new()
            }
        }
    }

    fn try_project(
        &self,
        resolved: &ResolvedTransaction,
    ) -> Result<Vec<EffectRecord>, UnresolvedIdentity> {
        let tx = resolved.tx();
        let kind = tx.kind();
        let principal = CoinAmount::from_units(tx.principal_value());

        let records = match &tx.body {
            TxBody::BlockReward { .. } => {
                let addr = self.address_of(&tx.tx_uid)?;
                vec![EffectRecord::new(kind, addr, Direction::Credit, principal)]
            }

            TxBody::AccountRegister { .. }
            | TxBody::ContractDeploy { .. }
            | TxBody::DelegateVote { .. } => {
                let addr = self.address_of(&tx.tx_uid)?;
                vec![EffectRecord::new(kind, addr, Direction::Debit, principal)]
            }

            TxBody::CoinTransfer { to_uid, memo, .. } => {
                let from = self.address_of(&tx.tx_uid)?;
                let to = self.address_of(to_uid)?;
                let mut record = EffectRecord::new(kind, from, Direction::Debit, principal);
                record.counterparty = Some(to.to_address());
                record.memo = Some(hex::encode(memo));
                vec![record]
            }

            TxBody::ContractInvoke {
                app_uid, arguments, ..
            } => {
                let from = self.address_of(&tx.tx_uid)?;
                let app = self.address_of(app_uid)?.to_address();

                let mut summary = EffectRecord::new(kind, from, Direction::Debit, principal);
                summary.counterparty = Some(app.clone());
                summary.arguments = Some(hex::encode(arguments));

                let outputs = self.outputs_of(resolved)?;
                let mut records = Vec::with_capacity(1 + outputs.len());
                records.push(summary);
                for output in outputs.iter() {
                    records.push(self.output_record(kind, &app, output)?);
                }
                records
            }

            TxBody::MultisigTransfer {
                signers,
                required,
                to_uid,
                memo,
                ..
            } => {
                let from = self.multisig_address(*required, signers)?;
                let to = self.address_of(to_uid)?;
                let mut record = EffectRecord::new(kind, from, Direction::Debit, principal);
                record.counterparty = Some(to.to_address());
                record.memo = Some(hex::encode(memo));
                vec![record]
            }

            // Not yet supported.
            TxBody::CdpStake { .. }
            | TxBody::CdpRedeem { .. }
            | TxBody::CdpLiquidate { .. }
            | TxBody::PriceFeed { .. }
            | TxBody::FcoinStake { .. }
            | TxBody::DexSettle { .. }
            | TxBody::DexCancelOrder { .. }
            | TxBody::DexBuyLimitOrder { .. }
            | TxBody::DexSellLimitOrder { .. }
            | TxBody::DexBuyMarketOrder { .. }
            | TxBody::DexSellMarketOrder { .. } => Vec::new(),
        };

        Ok(records)
    }

    fn address_of(&self, id: &UserId) -> Result<AddressHash, UnresolvedIdentity> {
        self.resolver
            .address_hash(id)?
            .ok_or(UnresolvedIdentity::User(*id))
    }

    fn output_record(
        &self,
        kind: TxKind,
        app: &str,
        output: &VmOperate,
    ) -> Result<EffectRecord, UnresolvedIdentity> {
        let address = match &output.account {
            OutputAccount::RegId(reg_id) => self.address_of(&UserId::RegId(*reg_id))?.to_address(),
            OutputAccount::Base58(address) => address.clone(),
        };
        let direction = match output.op {
            OutputOp::AddCoin => Direction::Credit,
            OutputOp::MinusCoin => Direction::Debit,
        };
        Ok(EffectRecord {
            tx_type: kind,
            address,
            counterparty: Some(app.to_string()),
            direction,
            amount: output.signed_amount(),
            freeze_height: (output.timeout_height > 0).then_some(output.timeout_height),
            memo: None,
            arguments: None,
        })
    }

    /// Address of an m-of-n multisig account: the digest of
    /// `required ‖ sorted, deduplicated co-signer keys`.
    fn multisig_address(
        &self,
        required: u8,
        signers: &[RegId],
    ) -> Result<AddressHash, UnresolvedIdentity> {
        let mut keys = BTreeSet::new();
        for reg_id in signers {
            let key = self
                .resolver
                .registered_key(*reg_id)?
                .ok_or(UnresolvedIdentity::CoSigner(*reg_id))?;
            keys.insert(key);
        }
        Ok(script_address(required, keys.iter().map(|k| k.as_bytes())))
    }
}

/// Hash a multisig script built from `required` and the co-signers' public
/// keys, which must already be in ascending order.
pub fn script_address<'a>(
    required: u8,
    sorted_keys: impl IntoIterator<Item = &'a [u8; 32]>,
) -> AddressHash {
    let mut script = vec![required];
    for key in sorted_keys {
        script.extend_from_slice(key);
    }
    AddressHash::from_bytes(address_digest(&script))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
