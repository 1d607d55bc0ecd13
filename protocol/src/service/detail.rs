//! Display-ready JSON record for a resolved transaction.
//!
//! Common fields first, then the kind-specific ones flattened into the same
//! object, then confirmation info and the raw hex. Amounts and fees are in
//! whole coins.

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::locator::{Provenance, ResolvedTransaction};
use crate::identity::IdentityResolver;
use crate::storage::state::{OutputAccount, OutputOp, VmOperate};
use crate::transaction::types::{CoinAmount, TxBody, TxId, TxKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxDetail {
    pub txid: TxId,
    pub tx_type: TxKind,
    pub ver: u16,
    pub tx_uid: String,
    /// Sender address, when it resolves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,
    pub fee: CoinAmount,
    pub valid_height: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_output: Option<Vec<OutputDetail>>,
    pub rawtx: String,
}

/// A contract output as shown to users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDetail {
    /// Registered id (`"h-i"`) or Base58 address, as recorded.
    pub account: String,
    pub op: &'static str,
    pub amount: CoinAmount,
    pub timeout_height: u64,
}

impl From<&VmOperate> for OutputDetail {
    fn from(op: &VmOperate) -> Self {
        Self {
            account: match &op.account {
                OutputAccount::RegId(reg_id) => reg_id.to_string(),
                OutputAccount::Base58(address) => address.clone(),
            },
            op: match op.op {
                OutputOp::AddCoin => "add",
                OutputOp::MinusCoin => "minus",
            },
            amount: CoinAmount::from_units(op.amount),
            timeout_height: op.timeout_height,
        }
    }
}

impl TxDetail {
    pub fn build(resolved: &ResolvedTransaction, resolver: &IdentityResolver) -> Self {
        let tx = resolved.tx();

        let (confirmed_height, confirmed_time, block_hash) = match resolved.provenance() {
            Provenance::Genesis { block_hash, time } => {
                (Some(0), Some(*time), Some(hex::encode(block_hash)))
            }
            Provenance::Indexed {
                height,
                block_hash,
                time,
            } => (Some(*height), Some(*time), Some(hex::encode(block_hash))),
            Provenance::Pending => (None, None, None),
        };

        let list_output = match (resolved.provenance(), &tx.body) {
            (Provenance::Indexed { .. }, TxBody::ContractInvoke { .. }) => {
                Some(resolved.outputs().iter().map(OutputDetail::from).collect())
            }
            _ => None,
        };

        Self {
            txid: resolved.txid(),
            tx_type: tx.kind(),
            ver: tx.version,
            tx_uid: tx.tx_uid.to_string(),
            addr: sender_address(resolved, resolver),
            fee: CoinAmount::from_units(tx.fee),
            valid_height: tx.valid_height,
            fields: body_fields(&tx.body),
            signature: tx.signature.as_ref().map(|s| s.to_hex()),
            confirmed_height,
            confirmed_time,
            block_hash,
            list_output,
            rawtx: resolved.raw_hex(),
        }
    }
}

fn coins(units: u64) -> Value {
    json!(CoinAmount::from_units(units))
}

fn body_fields(body: &TxBody) -> Map<String, Value> {
    let value = match body {
        TxBody::BlockReward { reward } => json!({ "reward_value": coins(*reward) }),
        TxBody::AccountRegister { miner_key } => json!({
            "miner_pubkey": miner_key.map(|k| k.to_hex()),
        }),
        TxBody::CoinTransfer {
            to_uid,
            amount,
            memo,
        } => json!({
            "to_uid": to_uid.to_string(),
            "amount": coins(*amount),
            "memo": hex::encode(memo),
        }),
        TxBody::ContractDeploy { code, memo } => json!({
            "code": hex::encode(code),
            "code_size": code.len(),
            "memo": hex::encode(memo),
        }),
        TxBody::ContractInvoke {
            app_uid,
            amount,
            arguments,
        } => json!({
            "to_uid": app_uid.to_string(),
            "amount": coins(*amount),
            "arguments": hex::encode(arguments),
        }),
        TxBody::DelegateVote { votes } => json!({
            "candidate_votes": votes
                .iter()
                .map(|v| json!({ "candidate_uid": v.candidate.to_string(), "votes": v.delta }))
                .collect::<Vec<_>>(),
        }),
        TxBody::MultisigTransfer {
            signers,
            required,
            to_uid,
            amount,
            memo,
        } => json!({
            "required": required,
            "signers": signers.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            "to_uid": to_uid.to_string(),
            "amount": coins(*amount),
            "memo": hex::encode(memo),
        }),
        // Not yet projected; show the payload as encoded.
        other => json!({ "payload": serde_json::to_value(other).unwrap_or(Value::Null) }),
    };

    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Sender address for display. A store failure only hides the field.
fn sender_address(resolved: &ResolvedTransaction, resolver: &IdentityResolver) -> Option<String> {
    match resolver.address_hash(&resolved.tx().tx_uid) {
        Ok(hash) => hash.map(|a| a.to_address()),
        Err(e) => {
            debug!(txid = %resolved.txid(), reason = %e, "sender address unavailable");
            None
        }
    }
}
