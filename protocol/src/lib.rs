// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TXGATE Core Library
//!
//! The boundary between a signing wallet and a ledger's storage tiers.
//! Two jobs:
//!
//! 1. **Submit.** Check an outgoing transaction's fee and the sender's
//!    balance, sign it with the sender's key, and hand it to the commit path.
//! 2. **Resolve.** Find any transaction id in the genesis block, the indexed
//!    block files, or the pending pool, and turn what was found into a
//!    display record plus a list of per-address balance effects.
//!
//! ## Architecture
//!
//! - **config**: Protocol constants, fee schedule, service knobs.
//! - **crypto**: Ed25519 keys, SHA-256/BLAKE3 hashing.
//! - **identity**: Addresses, registered ids, and the resolver between them.
//! - **transaction**: The transaction model, canonical encoding, signing.
//! - **ports**: Traits for every external collaborator.
//! - **storage**: Reference stores: sled index, block files, chain view.
//! - **mempool**: Reference pending pool.
//! - **wallet**: Reference keystore wallet.
//! - **service**: Fee guard, signer, locator, projector, and the façade.
//!
//! ## Design Philosophy
//!
//! 1. The service decides nothing about consensus. It reads what the stores
//!    say and reports it.
//! 2. Not found is `Ok(None)`. A broken store is an error. Never mix them.
//! 3. If it touches money, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod mempool;
pub mod ports;
pub mod service;
pub mod storage;
pub mod transaction;
pub mod wallet;
