//! # Service Errors
//!
//! Everything the service can report to a caller. Each error carries a
//! human-readable `Display` message and a machine-readable [`kind`] string
//! (`"fee_too_low"`, `"corrupt_index_or_store"`, ...) so the RPC layer can
//! map them without string matching.
//!
//! Store adapters keep their own error enums (`DbError`, `BlockFileError`)
//! and convert into [`StoreError`] at the port boundary.
//!
//! [`kind`]: SubmitError::kind

use thiserror::Error;

use crate::transaction::types::TxId;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Failure reported by any external store behind a port.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("block file error: {0}")]
    BlockFile(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Database(_) => "database",
            StoreError::BlockFile(_) => "block_file",
            StoreError::Decode(_) => "decode",
        }
    }
}

// ---------------------------------------------------------------------------
// WalletError
// ---------------------------------------------------------------------------

/// Failure reported by the wallet's signing path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet is locked")]
    Locked,

    #[error("no key for address {0}")]
    KeyNotFound(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

// ---------------------------------------------------------------------------
// SubmitError
// ---------------------------------------------------------------------------

/// Why a submission was refused. Nothing here is retried internally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("tx fee given is too small: {fee} < {min}")]
    FeeTooLow { fee: u64, min: u64 },

    #[error("account is unregistered")]
    AccountUnregistered,

    #[error("account balance is insufficient: {balance} < {fee}")]
    InsufficientBalance { balance: u64, fee: u64 },

    #[error("sender address not found in wallet")]
    KeyNotFound,

    #[error("wallet is locked; unlock it before signing")]
    KeyNotUnlocked,

    #[error("sign failed: {0}")]
    SignFailed(String),

    /// The commit path's own reason, verbatim.
    #[error("{0}")]
    CommitRejected(String),

    #[error("store error: {0}")]
    Store(String),
}

impl SubmitError {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::FeeTooLow { .. } => "fee_too_low",
            SubmitError::AccountUnregistered => "account_unregistered",
            SubmitError::InsufficientBalance { .. } => "insufficient_balance",
            SubmitError::KeyNotFound => "key_not_found",
            SubmitError::KeyNotUnlocked => "key_not_unlocked",
            SubmitError::SignFailed(_) => "sign_failed",
            SubmitError::CommitRejected(_) => "commit_rejected",
            SubmitError::Store(_) => "store",
        }
    }
}

impl From<StoreError> for SubmitError {
    fn from(e: StoreError) -> Self {
        SubmitError::Store(e.to_string())
    }
}

impl From<WalletError> for SubmitError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::Locked => SubmitError::KeyNotUnlocked,
            WalletError::KeyNotFound(_) => SubmitError::KeyNotFound,
            WalletError::Signing(reason) => SubmitError::SignFailed(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// LocateError
// ---------------------------------------------------------------------------

/// Resolution failures. "Not found" is `Ok(None)`, never an error.
#[derive(Debug, Error)]
pub enum LocateError {
    /// The index pointed somewhere, but the bytes there could not be read
    /// back as a transaction.
    #[error("corrupt index or block store for {txid}: {reason}")]
    CorruptIndexOrStore { txid: TxId, reason: String },

    /// A store failed before the index was even consulted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LocateError {
    pub fn kind(&self) -> &'static str {
        match self {
            LocateError::CorruptIndexOrStore { .. } => "corrupt_index_or_store",
            LocateError::Store(_) => "store",
        }
    }
}
