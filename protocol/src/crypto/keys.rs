//! # Key Management
//!
//! Ed25519 keypairs, public keys, and signatures for TXGATE accounts.
//!
//! Every registered account on the chain is backed by one Ed25519 public key;
//! the account's address hash is derived from it (see
//! [`PublicKey::address_hash`]). The wallet holds the matching [`KeyPair`]
//! and signs transaction signature hashes with it.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (ed25519-dalek does this for us).
//! - Key generation uses `OsRng`.
//! - Secret key bytes are never logged and never appear in `Debug` output.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::crypto::hash::address_digest;
use crate::identity::AddressHash;

/// Errors that can occur during key operations.
///
/// Deliberately vague about *why* something failed; error messages are not
/// a side channel for key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid signature bytes: expected 64 bytes")]
    InvalidSignature,
}

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

/// An Ed25519 signing keypair.
///
/// `KeyPair` intentionally does NOT implement `Serialize`/`Deserialize`.
/// Exporting a private key should be a deliberate call to
/// [`secret_key_bytes`](Self::secret_key_bytes), not a side effect of
/// putting a struct into a JSON response.
///
/// # Examples
///
/// ```
/// use txgate_protocol::crypto::keys::KeyPair;
///
/// let kp = KeyPair::generate();
/// let sig = kp.sign(b"pay 1 coin");
/// assert!(kp.public_key().verify(b"pay 1 coin", &sig));
/// ```
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    ///
    /// In Ed25519 the seed *is* the secret key. Weak seed, weak key.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded 32-byte secret key.
    ///
    /// Handy for devnet wallets passed on the command line. Don't do this
    /// with keys that hold real money.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// The public half of this keypair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Address hash of this keypair's public key.
    pub fn address_hash(&self) -> AddressHash {
        self.public_key().address_hash()
    }

    /// Sign a message. Ed25519 is deterministic: same key, same message,
    /// same signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }

    /// Export the raw 32-byte secret key. Handle with care.
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material, not even partially.
        write!(f, "KeyPair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// An Ed25519 public key, safe to share.
///
/// Ordered by raw bytes so sets of co-signer keys have a canonical order
/// when a multisig script is rebuilt.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    bytes: [u8; 32],
}

impl PublicKey {
    /// Create a `PublicKey` from raw bytes without point validation.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Create a `PublicKey` from a slice, validating length and that the
    /// bytes decode to an Ed25519 point.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Parse a hex-encoded public key.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Hex-encoded representation (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// The account address hash this key controls.
    pub fn address_hash(&self) -> AddressHash {
        AddressHash::from_bytes(address_digest(&self.bytes))
    }

    /// Verify a signature against this key. Returns `false` for malformed
    /// keys or signatures rather than erroring; callers only want yes/no.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Some(dalek_sig) = signature.to_dalek_signature() else {
            return false;
        };
        verifying_key.verify(message, &dalek_sig).is_ok()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// An Ed25519 signature. Always 64 bytes when produced by [`KeyPair::sign`];
/// stored as a `Vec<u8>` so malformed wire data decodes and then simply
/// fails verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    bytes: Vec<u8>,
}

impl Signature {
    /// Wrap raw signature bytes. Length is checked.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != 64 {
            return Err(KeyError::InvalidSignature);
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex-encoded signature (128 characters when well formed).
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    fn to_dalek_signature(&self) -> Option<DalekSignature> {
        let arr: [u8; 64] = self.bytes.as_slice().try_into().ok()?;
        Some(DalekSignature::from_bytes(&arr))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "Signature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "Signature({})", hex_str)
        }
    }
}
