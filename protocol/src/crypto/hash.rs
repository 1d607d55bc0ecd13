//! # Hashing Utilities
//!
//! Cryptographic hash functions used throughout TXGATE. Two families, no more:
//!
//! - **SHA-256**: transaction ids and signature hashes are
//!   `SHA-256(SHA-256(bytes))`, and Base58Check address checksums use the
//!   same double hash. This is what wallets and explorers on the chain
//!   already expect.
//!
//! - **BLAKE3**: address derivation (public key or multisig script to a
//!   20-byte address hash), block header hashes, and Merkle trees.

use sha2::{Digest, Sha256};

use crate::config::ADDRESS_HASH_LENGTH;

/// Compute the SHA-256 hash of the input data.
///
/// ```
/// use txgate_protocol::crypto::sha256;
///
/// let hash = sha256(b"txgate");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the double-SHA-256 hash: `SHA-256(SHA-256(data))`.
///
/// Used for transaction ids, signature hashes, and address checksums.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash several byte slices as if they were concatenated, without
/// allocating the concatenation.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Derive a 20-byte address digest: the leading bytes of `BLAKE3(data)`.
///
/// Applied to a raw public key for ordinary accounts and to the serialized
/// multisig script for multisig accounts.
pub fn address_digest(data: &[u8]) -> [u8; ADDRESS_HASH_LENGTH] {
    let full = blake3_hash(data);
    let mut out = [0u8; ADDRESS_HASH_LENGTH];
    out.copy_from_slice(&full[..ADDRESS_HASH_LENGTH]);
    out
}

/// Compute a binary Merkle root over 32-byte leaves.
///
/// Empty input yields all zeros. A single leaf is paired with itself, and an
/// odd leaf at any level is duplicated, so the root is always the output of
/// a hash operation.
pub fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut current_level: Vec<[u8; 32]> = leaves.to_vec();

    if current_level.len() == 1 {
        return blake3_hash_multi(&[current_level[0].as_slice(), current_level[0].as_slice()]);
    }

    while current_level.len() > 1 {
        let mut next_level = Vec::with_capacity((current_level.len() + 1) / 2);

        for chunk in current_level.chunks(2) {
            let left = &chunk[0];
            let right = if chunk.len() == 2 { &chunk[1] } else { &chunk[0] };
            next_level.push(blake3_hash_multi(&[left.as_slice(), right.as_slice()]));
        }

        current_level = next_level;
    }

    current_level[0]
}
