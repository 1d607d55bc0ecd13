//! # Transaction Module
//!
//! Construction, signing, and verification of TXGATE transactions.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        - TxKind, TxBody payloads, TxId, CoinAmount
//! builder.rs      - Transaction + fluent TransactionBuilder, canonical encoding
//! signing.rs      - Signing with an Ed25519 keypair
//! verification.rs - Structural checks and signature validation
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build** with [`TransactionBuilder`]. Leave the fee at zero to have it
//!    auto-filled.
//! 2. **Submit** through [`crate::service::TxService::submit_tx`], which
//!    checks fee and balance, canonicalizes the sender, signs via the wallet,
//!    and commits to the pending pool.
//! 3. **Resolve** by id through the locator, from genesis, the indexed block
//!    store, or the pending pool.
//!
//! ## Design Decisions
//!
//! - The canonical encoding is bincode in field-declaration order. The
//!   signature is the last field, so the raw bytes are the signable bytes
//!   plus the encoded signature.
//! - Ids are `double_sha256` of the signable bytes, which is also the
//!   signature hash.
//! - Amounts are `u64` smallest units. Floating point appears only in
//!   display output, via [`CoinAmount`].

pub mod builder;
pub mod signing;
pub mod types;
pub mod verification;

pub use builder::{Transaction, TransactionBuilder};
pub use signing::sign_transaction;
pub use types::{CandidateVote, CoinAmount, DexDeal, PricePoint, TxBody, TxId, TxKind};
pub use verification::{verify_signature, verify_structure, TransactionError};
