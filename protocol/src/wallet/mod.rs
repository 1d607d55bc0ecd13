//! # Wallet Module
//!
//! Reference implementation of the [`crate::ports::Wallet`] port: an
//! in-memory Ed25519 keystore whose commit path feeds the pending pool.

pub mod keystore;

pub use keystore::Keystore;
