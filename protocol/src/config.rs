//! # Protocol Configuration & Constants
//!
//! Every magic number in TXGATE lives here. If you're hardcoding a constant
//! somewhere else, move it here first.
//!
//! Two kinds of things live in this file:
//!
//! - **Constants** that define the chain's units and encodings (coin scale,
//!   address version byte, fee fork height). Changing these changes what
//!   every address and every amount means.
//! - **[`ServiceConfig`]**, the runtime knobs the node passes into the
//!   service: whether the transaction index is enabled, the fee schedule,
//!   and the pending pool limits.

use serde::{Deserialize, Serialize};

use crate::mempool::MempoolConfig;
use crate::transaction::types::TxKind;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Smallest units per whole coin. Every amount on the wire is an integer
/// count of these; division by `COIN` happens only at display time.
pub const COIN: u64 = 100_000_000;

/// Number of decimal places implied by [`COIN`].
pub const COIN_DECIMALS: u32 = 8;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Version byte prepended to an address hash before Base58Check encoding.
/// 0x49 puts every mainnet address in the `W...` range.
pub const ADDRESS_VERSION: u8 = 0x49;

/// Length of an address hash in bytes.
pub const ADDRESS_HASH_LENGTH: usize = 20;

/// Length of the Base58Check checksum suffix.
pub const ADDRESS_CHECKSUM_LENGTH: usize = 4;

/// Wire length of a registered id: 4-byte block height + 2-byte index.
pub const REG_ID_LENGTH: usize = 6;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Transaction format version stamped on newly built transactions.
pub const TX_VERSION: u16 = 1;

/// Largest encoded transaction read back from a block file, in bytes.
pub const MAX_TX_SIZE: u64 = 4 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Fee Parameters
// ---------------------------------------------------------------------------

/// Height at which the post-fork fee table takes over.
pub const FEE_FORK_HEIGHT: u64 = 3_000_000;

/// Default pre-fork minimum fee for a transaction kind, in smallest units.
pub fn default_min_fee(kind: TxKind) -> u64 {
    match kind {
        TxKind::BlockReward => 0,
        TxKind::AccountRegister => 10_000,
        TxKind::CoinTransfer => 10_000,
        TxKind::ContractDeploy => 100_000_000,
        TxKind::ContractInvoke => 100_000,
        TxKind::DelegateVote => 10_000,
        TxKind::MultisigTransfer => 10_000,
        TxKind::PriceFeed => 10_000,
        TxKind::CdpStake
        | TxKind::CdpRedeem
        | TxKind::CdpLiquidate
        | TxKind::FcoinStake
        | TxKind::DexSettle
        | TxKind::DexCancelOrder
        | TxKind::DexBuyLimitOrder
        | TxKind::DexSellLimitOrder
        | TxKind::DexBuyMarketOrder
        | TxKind::DexSellMarketOrder => 100_000,
    }
}

/// Default post-fork minimum fee. Only the kinds that actually got repriced
/// differ from [`default_min_fee`].
pub fn default_min_fee_post_fork(kind: TxKind) -> u64 {
    match kind {
        TxKind::CoinTransfer => 100_000,
        TxKind::ContractDeploy => 110_000_000,
        TxKind::ContractInvoke => 1_000_000,
        TxKind::MultisigTransfer => 100_000,
        other => default_min_fee(other),
    }
}

/// Minimum fee policy, keyed by transaction kind and chain height.
///
/// The schedule is plain data so operators (and tests) can override it
/// without recompiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Height from which `post_fork` applies (inclusive).
    pub fork_height: u64,
    /// Minimum fees before the fork, one entry per kind.
    pub pre_fork: Vec<(TxKind, u64)>,
    /// Minimum fees from the fork height on.
    pub post_fork: Vec<(TxKind, u64)>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            fork_height: FEE_FORK_HEIGHT,
            pre_fork: TxKind::ALL
                .iter()
                .map(|k| (*k, default_min_fee(*k)))
                .collect(),
            post_fork: TxKind::ALL
                .iter()
                .map(|k| (*k, default_min_fee_post_fork(*k)))
                .collect(),
        }
    }
}

impl FeeSchedule {
    /// A flat schedule: the same minimum for every kind at every height.
    pub fn flat(min_fee: u64) -> Self {
        let table: Vec<(TxKind, u64)> = TxKind::ALL.iter().map(|k| (*k, min_fee)).collect();
        Self {
            fork_height: 0,
            pre_fork: table.clone(),
            post_fork: table,
        }
    }

    /// Minimum fee for `kind` at `height`.
    ///
    /// Kinds missing from the active table fall back to the built-in
    /// defaults, so a partially specified override never yields zero by
    /// accident.
    pub fn min_fee(&self, kind: TxKind, height: u64) -> u64 {
        let (table, fallback): (&[(TxKind, u64)], fn(TxKind) -> u64) =
            if height >= self.fork_height {
                (&self.post_fork, default_min_fee_post_fork)
            } else {
                (&self.pre_fork, default_min_fee)
            };

        table
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, fee)| *fee)
            .unwrap_or_else(|| fallback(kind))
    }
}

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Default RPC API port.
pub const DEFAULT_RPC_PORT: u16 = 6968;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 6969;

// ---------------------------------------------------------------------------
// ServiceConfig
// ---------------------------------------------------------------------------

/// Runtime configuration for [`crate::service::TxService`] and the
/// reference adapters it is usually wired with.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Whether the on-disk transaction index is consulted by the locator.
    pub tx_index: bool,
    /// Minimum fee policy.
    pub fee_schedule: FeeSchedule,
    /// Pending pool limits.
    pub mempool: MempoolConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tx_index: true,
            fee_schedule: FeeSchedule::default(),
            mempool: MempoolConfig::default(),
        }
    }
}
