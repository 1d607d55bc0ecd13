//! # Address Hashes & Registered Ids
//!
//! Two ways to name an account on chain:
//!
//! - An [`AddressHash`] is the canonical 20-byte identifier derived from a
//!   public key (or a multisig script). Its textual form is Base58Check:
//!
//!   ```text
//!   payload  = ADDRESS_VERSION || hash (20 bytes)
//!   checksum = double_sha256(payload)[..4]
//!   address  = base58(payload || checksum)
//!   ```
//!
//! - A [`RegId`] is the compact alias the chain assigns when an account
//!   registers: the height of the registering block plus the transaction's
//!   index in that block, written `"<height>-<index>"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{ADDRESS_CHECKSUM_LENGTH, ADDRESS_HASH_LENGTH, ADDRESS_VERSION, REG_ID_LENGTH};
use crate::crypto::hash::double_sha256;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while parsing textual or wire-form identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The Base58 string could not be decoded.
    #[error("base58 decode error: {0}")]
    Base58(String),

    /// The decoded payload has the wrong length.
    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    /// The version byte does not match this chain.
    #[error("invalid address version: expected 0x{expected:02x}, got 0x{got:02x}")]
    InvalidVersion { expected: u8, got: u8 },

    /// The Base58Check checksum does not match.
    #[error("address checksum mismatch")]
    BadChecksum,

    /// The string is not of the form `<height>-<index>`.
    #[error("malformed registered id: {0}")]
    MalformedRegId(String),
}

// ---------------------------------------------------------------------------
// AddressHash
// ---------------------------------------------------------------------------

/// The canonical 20-byte account identifier.
///
/// # Examples
///
/// ```
/// use txgate_protocol::identity::AddressHash;
///
/// let hash = AddressHash::from_bytes([7u8; 20]);
/// let text = hash.to_address();
/// assert_eq!(AddressHash::from_address(&text).unwrap(), hash);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressHash([u8; ADDRESS_HASH_LENGTH]);

impl AddressHash {
    /// Wrap raw hash bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_HASH_LENGTH] {
        &self.0
    }

    /// `true` for the all-zero hash, which never names a real account.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Base58Check-encode this hash as a user-facing address.
    pub fn to_address(&self) -> String {
        let mut payload = Vec::with_capacity(1 + ADDRESS_HASH_LENGTH + ADDRESS_CHECKSUM_LENGTH);
        payload.push(ADDRESS_VERSION);
        payload.extend_from_slice(&self.0);
        let checksum = double_sha256(&payload);
        payload.extend_from_slice(&checksum[..ADDRESS_CHECKSUM_LENGTH]);
        bs58::encode(payload).into_string()
    }

    /// Parse a Base58Check address, validating length, version, and
    /// checksum.
    pub fn from_address(address: &str) -> Result<Self, AddressError> {
        let decoded = bs58::decode(address)
            .into_vec()
            .map_err(|e| AddressError::Base58(e.to_string()))?;

        let expected = 1 + ADDRESS_HASH_LENGTH + ADDRESS_CHECKSUM_LENGTH;
        if decoded.len() != expected {
            return Err(AddressError::InvalidLength {
                expected,
                got: decoded.len(),
            });
        }

        let (payload, checksum) = decoded.split_at(1 + ADDRESS_HASH_LENGTH);
        if payload[0] != ADDRESS_VERSION {
            return Err(AddressError::InvalidVersion {
                expected: ADDRESS_VERSION,
                got: payload[0],
            });
        }
        if double_sha256(payload)[..ADDRESS_CHECKSUM_LENGTH] != *checksum {
            return Err(AddressError::BadChecksum);
        }

        let mut hash = [0u8; ADDRESS_HASH_LENGTH];
        hash.copy_from_slice(&payload[1..]);
        Ok(Self(hash))
    }
}

impl fmt::Display for AddressHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_address())
    }
}

impl fmt::Debug for AddressHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddressHash({})", hex::encode(self.0))
    }
}

impl Serialize for AddressHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_address())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for AddressHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            AddressHash::from_address(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            let hash: [u8; ADDRESS_HASH_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
                serde::de::Error::custom(format!(
                    "expected {}-byte address hash, got {}",
                    ADDRESS_HASH_LENGTH,
                    bytes.len()
                ))
            })?;
            Ok(AddressHash(hash))
        }
    }
}

// ---------------------------------------------------------------------------
// RegId
// ---------------------------------------------------------------------------

/// A chain-assigned registered id: `(block height, tx index)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegId {
    /// Height of the block containing the registration.
    pub height: u32,
    /// Index of the registration transaction within that block.
    pub index: u16,
}

impl RegId {
    pub fn new(height: u32, index: u16) -> Self {
        Self { height, index }
    }

    /// 6-byte wire form: height (LE u32) followed by index (LE u16).
    pub fn to_bytes(&self) -> [u8; REG_ID_LENGTH] {
        let mut out = [0u8; REG_ID_LENGTH];
        out[..4].copy_from_slice(&self.height.to_le_bytes());
        out[4..].copy_from_slice(&self.index.to_le_bytes());
        out
    }

    /// Decode the 6-byte wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        if bytes.len() != REG_ID_LENGTH {
            return Err(AddressError::InvalidLength {
                expected: REG_ID_LENGTH,
                got: bytes.len(),
            });
        }
        let mut height = [0u8; 4];
        height.copy_from_slice(&bytes[..4]);
        let mut index = [0u8; 2];
        index.copy_from_slice(&bytes[4..]);
        Ok(Self {
            height: u32::from_le_bytes(height),
            index: u16::from_le_bytes(index),
        })
    }
}

impl FromStr for RegId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AddressError::MalformedRegId(s.to_string());
        let (height, index) = s.split_once('-').ok_or_else(malformed)?;
        let height = height.parse::<u32>().map_err(|_| malformed())?;
        let index = index.parse::<u16>().map_err(|_| malformed())?;
        Ok(Self { height, index })
    }
}

impl fmt::Display for RegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.height, self.index)
    }
}

impl fmt::Debug for RegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegId({})", self)
    }
}

impl Serialize for RegId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(&self.to_bytes())
        }
    }
}

impl<'de> Deserialize<'de> for RegId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            RegId::from_bytes(&bytes).map_err(serde::de::Error::custom)
        }
    }
}
