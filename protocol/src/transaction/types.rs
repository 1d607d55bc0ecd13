//! Core type definitions for TXGATE transactions.
//!
//! These types form the vocabulary of every transaction the gateway handles:
//! the payload-free [`TxKind`] discriminant, the [`TxBody`] payloads, the
//! [`TxId`] digest, and the [`CoinAmount`] used for display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::COIN;
use crate::crypto::keys::PublicKey;
use crate::identity::{RegId, UserId};

// ---------------------------------------------------------------------------
// TxKind
// ---------------------------------------------------------------------------

/// Discriminant for the operation a transaction represents.
///
/// The wire names (`"BCOIN_TRANSFER_TX"`, `"COMMON_MTX"`, ...) are what
/// explorers and wallets already key on, so they never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxKind {
    #[serde(rename = "BLOCK_REWARD_TX")]
    BlockReward,
    #[serde(rename = "ACCOUNT_REGISTER_TX")]
    AccountRegister,
    #[serde(rename = "BCOIN_TRANSFER_TX")]
    CoinTransfer,
    #[serde(rename = "CONTRACT_DEPLOY_TX")]
    ContractDeploy,
    #[serde(rename = "CONTRACT_INVOKE_TX")]
    ContractInvoke,
    #[serde(rename = "DELEGATE_VOTE_TX")]
    DelegateVote,
    #[serde(rename = "COMMON_MTX")]
    MultisigTransfer,
    #[serde(rename = "CDP_STAKE_TX")]
    CdpStake,
    #[serde(rename = "CDP_REDEEM_TX")]
    CdpRedeem,
    #[serde(rename = "CDP_LIQUIDATE_TX")]
    CdpLiquidate,
    #[serde(rename = "PRICE_FEED_TX")]
    PriceFeed,
    #[serde(rename = "FCOIN_STAKE_TX")]
    FcoinStake,
    #[serde(rename = "DEX_SETTLE_TX")]
    DexSettle,
    #[serde(rename = "DEX_CANCEL_ORDER_TX")]
    DexCancelOrder,
    #[serde(rename = "DEX_BUY_LIMIT_ORDER_TX")]
    DexBuyLimitOrder,
    #[serde(rename = "DEX_SELL_LIMIT_ORDER_TX")]
    DexSellLimitOrder,
    #[serde(rename = "DEX_BUY_MARKET_ORDER_TX")]
    DexBuyMarketOrder,
    #[serde(rename = "DEX_SELL_MARKET_ORDER_TX")]
    DexSellMarketOrder,
}

impl TxKind {
    /// Every kind, in declaration order.
    pub const ALL: &'static [TxKind] = &[
        TxKind::BlockReward,
        TxKind::AccountRegister,
        TxKind::CoinTransfer,
        TxKind::ContractDeploy,
        TxKind::ContractInvoke,
        TxKind::DelegateVote,
        TxKind::MultisigTransfer,
        TxKind::CdpStake,
        TxKind::CdpRedeem,
        TxKind::CdpLiquidate,
        TxKind::PriceFeed,
        TxKind::FcoinStake,
        TxKind::DexSettle,
        TxKind::DexCancelOrder,
        TxKind::DexBuyLimitOrder,
        TxKind::DexSellLimitOrder,
        TxKind::DexBuyMarketOrder,
        TxKind::DexSellMarketOrder,
    ];

    /// Stable wire name.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::BlockReward => "BLOCK_REWARD_TX",
            Self::AccountRegister => "ACCOUNT_REGISTER_TX",
            Self::CoinTransfer => "BCOIN_TRANSFER_TX",
            Self::ContractDeploy => "CONTRACT_DEPLOY_TX",
            Self::ContractInvoke => "CONTRACT_INVOKE_TX",
            Self::DelegateVote => "DELEGATE_VOTE_TX",
            Self::MultisigTransfer => "COMMON_MTX",
            Self::CdpStake => "CDP_STAKE_TX",
            Self::CdpRedeem => "CDP_REDEEM_TX",
            Self::CdpLiquidate => "CDP_LIQUIDATE_TX",
            Self::PriceFeed => "PRICE_FEED_TX",
            Self::FcoinStake => "FCOIN_STAKE_TX",
            Self::DexSettle => "DEX_SETTLE_TX",
            Self::DexCancelOrder => "DEX_CANCEL_ORDER_TX",
            Self::DexBuyLimitOrder => "DEX_BUY_LIMIT_ORDER_TX",
            Self::DexSellLimitOrder => "DEX_SELL_LIMIT_ORDER_TX",
            Self::DexBuyMarketOrder => "DEX_BUY_MARKET_ORDER_TX",
            Self::DexSellMarketOrder => "DEX_SELL_MARKET_ORDER_TX",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ---------------------------------------------------------------------------
// TxId
// ---------------------------------------------------------------------------

/// A transaction id: `double_sha256(signable_bytes)`. Displayed as lowercase
/// hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxId([u8; 32]);

impl TxId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut out)?;
        Ok(Self(out))
    }
}

impl FromStr for TxId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", &self.to_hex()[..16])
    }
}

impl Serialize for TxId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for TxId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            TxId::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            Ok(TxId(<[u8; 32]>::deserialize(deserializer)?))
        }
    }
}

// ---------------------------------------------------------------------------
// CoinAmount
// ---------------------------------------------------------------------------

/// A signed amount of smallest units, displayed in whole coins.
///
/// Arithmetic stays in integers. The only conversion to floating point
/// happens at the JSON boundary, and it goes through the exact decimal
/// string so the result is the nearest `f64` to the true value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CoinAmount(i128);

impl CoinAmount {
    pub const ZERO: CoinAmount = CoinAmount(0);

    pub fn from_units(units: u64) -> Self {
        Self(units as i128)
    }

    pub fn from_signed_units(units: i128) -> Self {
        Self(units)
    }

    pub fn units(&self) -> i128 {
        self.0
    }

    pub fn negated(&self) -> Self {
        Self(-self.0)
    }

    /// Exact decimal rendering with trailing zeros trimmed: `1.5`, `-0.5`,
    /// `2`.
    pub fn to_decimal_string(&self) -> String {
        let coin = COIN as u128;
        let abs = self.0.unsigned_abs();
        let whole = abs / coin;
        let frac = abs % coin;
        let sign = if self.0 < 0 { "-" } else { "" };
        if frac == 0 {
            return format!("{sign}{whole}");
        }
        let frac = format!("{:08}", frac);
        format!("{sign}{whole}.{}", frac.trim_end_matches('0'))
    }

    /// Nearest `f64` to the exact coin value.
    pub fn as_coins(&self) -> f64 {
        self.to_decimal_string().parse().unwrap_or_default()
    }
}

impl fmt::Display for CoinAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl Serialize for CoinAmount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_coins())
    }
}

impl<'de> Deserialize<'de> for CoinAmount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let coins = f64::deserialize(deserializer)?;
        if !coins.is_finite() {
            return Err(serde::de::Error::custom("coin amount must be finite"));
        }
        Ok(CoinAmount((coins * COIN as f64).round() as i128))
    }
}

// ---------------------------------------------------------------------------
// Payload pieces
// ---------------------------------------------------------------------------

/// One candidate's vote change inside a delegate vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateVote {
    pub candidate: UserId,
    /// Positive adds votes, negative revokes them.
    pub delta: i64,
}

/// A single oracle quote inside a price feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub coin_symbol: String,
    pub price_symbol: String,
    pub price: u64,
}

/// One matched trade inside a DEX settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexDeal {
    pub buy_order_id: TxId,
    pub sell_order_id: TxId,
    pub price: u64,
    pub coin_amount: u64,
    pub asset_amount: u64,
}

// ---------------------------------------------------------------------------
// TxBody
// ---------------------------------------------------------------------------

/// Kind-specific payload. The sender is always the transaction's `tx_uid`
/// (for rewards, the recipient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxBody {
    BlockReward {
        reward: u64,
    },
    AccountRegister {
        miner_key: Option<PublicKey>,
    },
    CoinTransfer {
        to_uid: UserId,
        amount: u64,
        memo: Vec<u8>,
    },
    ContractDeploy {
        code: Vec<u8>,
        memo: Vec<u8>,
    },
    ContractInvoke {
        app_uid: UserId,
        amount: u64,
        arguments: Vec<u8>,
    },
    DelegateVote {
        votes: Vec<CandidateVote>,
    },
    MultisigTransfer {
        /// Co-signers, by registered id.
        signers: Vec<RegId>,
        required: u8,
        to_uid: UserId,
        amount: u64,
        memo: Vec<u8>,
    },
    CdpStake {
        bcoins_to_stake: u64,
        scoins_to_mint: u64,
    },
    CdpRedeem {
        scoins_to_repay: u64,
        bcoins_to_redeem: u64,
    },
    CdpLiquidate {
        cdp_owner: UserId,
        scoins_to_liquidate: u64,
    },
    PriceFeed {
        prices: Vec<PricePoint>,
    },
    FcoinStake {
        fcoins_to_stake: i64,
    },
    DexSettle {
        deals: Vec<DexDeal>,
    },
    DexCancelOrder {
        order_id: TxId,
    },
    DexBuyLimitOrder {
        coin_symbol: String,
        asset_symbol: String,
        asset_amount: u64,
        price: u64,
    },
    DexSellLimitOrder {
        coin_symbol: String,
        asset_symbol: String,
        asset_amount: u64,
        price: u64,
    },
    DexBuyMarketOrder {
        coin_symbol: String,
        asset_symbol: String,
        coin_amount: u64,
    },
    DexSellMarketOrder {
        coin_symbol: String,
        asset_symbol: String,
        asset_amount: u64,
    },
}

impl TxBody {
    pub fn kind(&self) -> TxKind {
        match self {
            TxBody::BlockReward { .. } => TxKind::BlockReward,
            TxBody::AccountRegister { .. } => TxKind::AccountRegister,
            TxBody::CoinTransfer { .. } => TxKind::CoinTransfer,
            TxBody::ContractDeploy { .. } => TxKind::ContractDeploy,
            TxBody::ContractInvoke { .. } => TxKind::ContractInvoke,
            TxBody::DelegateVote { .. } => TxKind::DelegateVote,
            TxBody::MultisigTransfer { .. } => TxKind::MultisigTransfer,
            TxBody::CdpStake { .. } => TxKind::CdpStake,
            TxBody::CdpRedeem { .. } => TxKind::CdpRedeem,
            TxBody::CdpLiquidate { .. } => TxKind::CdpLiquidate,
            TxBody::PriceFeed { .. } => TxKind::PriceFeed,
            TxBody::FcoinStake { .. } => TxKind::FcoinStake,
            TxBody::DexSettle { .. } => TxKind::DexSettle,
            TxBody::DexCancelOrder { .. } => TxKind::DexCancelOrder,
            TxBody::DexBuyLimitOrder { .. } => TxKind::DexBuyLimitOrder,
            TxBody::DexSellLimitOrder { .. } => TxKind::DexSellLimitOrder,
            TxBody::DexBuyMarketOrder { .. } => TxKind::DexBuyMarketOrder,
            TxBody::DexSellMarketOrder { .. } => TxKind::DexSellMarketOrder,
        }
    }

    /// The native-coin value this payload moves, in smallest units.
    ///
    /// Saturates rather than wrapping; a vote or settlement list large
    /// enough to overflow is malformed anyway.
    pub fn principal_value(&self) -> u64 {
        match self {
            TxBody::BlockReward { reward } => *reward,
            TxBody::AccountRegister { .. } | TxBody::ContractDeploy { .. } => 0,
            TxBody::CoinTransfer { amount, .. }
            | TxBody::ContractInvoke { amount, .. }
            | TxBody::MultisigTransfer { amount, .. } => *amount,
            TxBody::DelegateVote { votes } => votes
                .iter()
                .fold(0u64, |acc, v| acc.saturating_add(v.delta.unsigned_abs())),
            TxBody::CdpStake { bcoins_to_stake, .. } => *bcoins_to_stake,
            TxBody::CdpRedeem {
                bcoins_to_redeem, ..
            } => *bcoins_to_redeem,
            TxBody::CdpLiquidate {
                scoins_to_liquidate,
                ..
            } => *scoins_to_liquidate,
            TxBody::PriceFeed { .. } | TxBody::DexCancelOrder { .. } => 0,
            TxBody::FcoinStake { fcoins_to_stake } => fcoins_to_stake.unsigned_abs(),
            TxBody::DexSettle { deals } => deals
                .iter()
                .fold(0u64, |acc, d| acc.saturating_add(d.coin_amount)),
            TxBody::DexBuyLimitOrder { asset_amount, .. }
            | TxBody::DexSellLimitOrder { asset_amount, .. }
            | TxBody::DexSellMarketOrder { asset_amount, .. } => *asset_amount,
            TxBody::DexBuyMarketOrder { coin_amount, .. } => *coin_amount,
        }
    }
}
