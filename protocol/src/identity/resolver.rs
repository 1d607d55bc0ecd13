//! # Identity Resolver
//!
//! Maps any [`UserId`] to the canonical [`AddressHash`] (and, for registered
//! accounts, the [`RegId`]). Pure lookup: nothing here writes to the store.

use std::sync::Arc;
use thiserror::Error;

use super::address::{AddressError, AddressHash, RegId};
use super::user_id::UserId;
use crate::crypto::keys::PublicKey;
use crate::error::StoreError;
use crate::ports::AccountStore;
use crate::storage::state::Account;

/// Why an identity could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unknown registered id {0}")]
    UnknownRegId(RegId),

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read-only identity lookups over an [`AccountStore`].
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn AccountStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    pub fn account(&self, id: &UserId) -> Result<Option<Account>, StoreError> {
        self.store.account(id)
    }

    /// Canonical address hash, or `None` for a registered id nobody holds.
    pub fn address_hash(&self, id: &UserId) -> Result<Option<AddressHash>, StoreError> {
        self.store.address_hash(id)
    }

    pub fn reg_id(&self, id: &UserId) -> Result<Option<RegId>, StoreError> {
        self.store.reg_id(id)
    }

    /// Public key recorded for a registered account.
    pub fn registered_key(&self, reg_id: RegId) -> Result<Option<PublicKey>, StoreError> {
        Ok(self
            .store
            .account(&UserId::RegId(reg_id))?
            .filter(Account::is_registered)
            .and_then(|a| a.public_key))
    }

    /// Parse a user-supplied address: either a registered id (`"1024-7"`),
    /// resolved through the store, or a Base58Check address.
    pub fn parse_address(&self, s: &str) -> Result<AddressHash, ResolveError> {
        if let Ok(reg_id) = s.parse::<RegId>() {
            return self
                .address_hash(&UserId::RegId(reg_id))?
                .ok_or(ResolveError::UnknownRegId(reg_id));
        }
        let hash = AddressHash::from_address(s)?;
        if hash.is_empty() {
            return Err(ResolveError::InvalidAddress(AddressError::InvalidLength {
                expected: crate::config::ADDRESS_HASH_LENGTH,
                got: 0,
            }));
        }
        Ok(hash)
    }

    /// Parse a user-supplied identity without resolving it: a registered id
    /// stays a [`UserId::RegId`], an address becomes a [`UserId::KeyId`].
    pub fn parse_user_id(s: &str) -> Result<UserId, ResolveError> {
        if let Ok(reg_id) = s.parse::<RegId>() {
            return Ok(UserId::RegId(reg_id));
        }
        Ok(UserId::KeyId(AddressHash::from_address(s)?))
    }
}
