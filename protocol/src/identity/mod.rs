//! # Identity Module
//!
//! How accounts are named, and how those names are turned into the one
//! canonical identifier the ledger keys on.
//!
//! The identity stack is layered:
//!
//! 1. **AddressHash**: 20 bytes, the first 20 of `BLAKE3(public key)` (or of
//!    a multisig script). Shown to users as a Base58Check `W...` address.
//! 2. **RegId**: the `"<height>-<index>"` alias the chain assigns when an
//!    account registers. Compact, but meaningless without the account store.
//! 3. **UserId**: a transaction field holding any one of public key,
//!    `RegId`, or `AddressHash`.
//! 4. **IdentityResolver**: turns any `UserId` into an `AddressHash` (and a
//!    `RegId`, when the account has one).
//!
//! ## Design Decisions
//!
//! - Base58Check (not Bech32) for addresses: wallets on this chain already
//!   parse the `W...` form, and the 4-byte checksum catches typos.
//! - Resolution is read-only and never caches. The account store is the
//!   source of truth; stale caches are how you send coins to the wrong
//!   account after a reorg.

pub mod address;
pub mod resolver;
pub mod user_id;

pub use address::{AddressError, AddressHash, RegId};
pub use resolver::{IdentityResolver, ResolveError};
pub use user_id::UserId;
