//! # UserId
//!
//! A transaction can name its sender (or recipient) three ways: by raw
//! public key, by the registered id the chain handed out, or by address
//! hash. [`UserId`] carries exactly one of them. Turning any of these into
//! the canonical [`AddressHash`] is the resolver's job, since a `RegId` only
//! means something once you ask the account store.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::address::{AddressHash, RegId};
use crate::crypto::keys::PublicKey;

/// One of the three ways to name an account.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserId {
    /// A raw Ed25519 public key. Resolvable without any store lookup.
    PubKey(PublicKey),
    /// A chain-assigned registered id.
    RegId(RegId),
    /// An address hash (usually parsed from a Base58Check address).
    KeyId(AddressHash),
}

impl UserId {
    /// The address hash, when it can be derived without a store lookup.
    pub fn direct_address(&self) -> Option<AddressHash> {
        match self {
            UserId::PubKey(pk) => Some(pk.address_hash()),
            UserId::KeyId(hash) => Some(*hash),
            UserId::RegId(_) => None,
        }
    }

    pub fn as_reg_id(&self) -> Option<RegId> {
        match self {
            UserId::RegId(id) => Some(*id),
            _ => None,
        }
    }

    /// Short tag for logs.
    pub fn variant_name(&self) -> &'static str {
        match self {
            UserId::PubKey(_) => "pubkey",
            UserId::RegId(_) => "regid",
            UserId::KeyId(_) => "keyid",
        }
    }
}

impl From<PublicKey> for UserId {
    fn from(pk: PublicKey) -> Self {
        UserId::PubKey(pk)
    }
}

impl From<RegId> for UserId {
    fn from(id: RegId) -> Self {
        UserId::RegId(id)
    }
}

impl From<AddressHash> for UserId {
    fn from(hash: AddressHash) -> Self {
        UserId::KeyId(hash)
    }
}

/// Text form used in display records: hex public key, `h-i` regid, or the
/// Base58Check address.
impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::PubKey(pk) => write!(f, "{}", pk.to_hex()),
            UserId::RegId(id) => write!(f, "{}", id),
            UserId::KeyId(hash) => write!(f, "{}", hash.to_address()),
        }
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId::{}({})", self.variant_name(), self)
    }
}
