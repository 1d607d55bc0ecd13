//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers around audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for account keys and transaction signatures.
//! - **SHA-256** (`sha2`) for transaction ids and address checksums.
//! - **BLAKE3** for address derivation, block hashes, and Merkle roots.
//!
//! Nothing here is hand-rolled. If you're tempted to optimize these
//! functions, reconsider.

pub mod hash;
pub mod keys;

pub use hash::{address_digest, blake3_hash, double_sha256, merkle_root, sha256};
pub use keys::{KeyError, KeyPair, PublicKey, Signature};
