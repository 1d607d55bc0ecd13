//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] assembles an unsigned [`Transaction`]. It does
//! not sign; that happens in [`super::signing`] or through a wallet. The
//! split keeps construction testable without key material.

use serde::{Deserialize, Serialize};

use super::types::{TxBody, TxId, TxKind};
use crate::config::TX_VERSION;
use crate::crypto::hash::double_sha256;
use crate::crypto::keys::Signature;
use crate::identity::UserId;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A TXGATE transaction.
///
/// # Canonical encoding
///
/// The canonical encoding is bincode over the fields in declaration order.
/// [`signable_bytes`](Self::signable_bytes) encodes every field except
/// `signature`; since `signature` is the last field,
/// [`raw_bytes`](Self::raw_bytes) is exactly the signable bytes followed by
/// the encoded signature. The id and the signature hash are both
/// `double_sha256(signable_bytes)`, so the id is stable across signing.
///
/// Field order is part of the wire format. Do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Format version.
    pub version: u16,
    /// Height up to which the transaction may be included.
    pub valid_height: u64,
    /// Sender (for block rewards, the recipient).
    pub tx_uid: UserId,
    /// Fee in smallest units. Zero means "fill in the minimum for me".
    pub fee: u64,
    pub body: TxBody,
    /// Ed25519 signature over [`signature_hash`](Self::signature_hash).
    pub signature: Option<Signature>,
}

/// Borrowed view of everything but the signature, in wire order.
#[derive(Serialize)]
struct Signable<'a> {
    version: u16,
    valid_height: u64,
    tx_uid: &'a UserId,
    fee: u64,
    body: &'a TxBody,
}

impl Transaction {
    pub fn kind(&self) -> TxKind {
        self.body.kind()
    }

    /// Canonical bytes covered by the signature.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let view = Signable {
            version: self.version,
            valid_height: self.valid_height,
            tx_uid: &self.tx_uid,
            fee: self.fee,
            body: &self.body,
        };
        // Serializing plain data into a Vec cannot fail.
        bincode::serialize(&view).unwrap_or_default()
    }

    /// Full canonical encoding, signature included.
    pub fn raw_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    /// Decode a transaction from its raw bytes.
    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// The digest the sender signs.
    pub fn signature_hash(&self) -> [u8; 32] {
        double_sha256(&self.signable_bytes())
    }

    pub fn txid(&self) -> TxId {
        TxId::from_bytes(self.signature_hash())
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Native-coin value moved by the payload, in smallest units.
    pub fn principal_value(&self) -> u64 {
        self.body.principal_value()
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`]s.
///
/// ```
/// use txgate_protocol::identity::RegId;
/// use txgate_protocol::transaction::{TransactionBuilder, TxBody};
///
/// let tx = TransactionBuilder::new(
///     RegId::new(10, 1).into(),
///     TxBody::CoinTransfer {
///         to_uid: RegId::new(11, 3).into(),
///         amount: 150_000_000,
///         memo: b"hi".to_vec(),
///     },
/// )
/// .fee(10_000)
/// .valid_height(500)
/// .build();
///
/// assert!(!tx.is_signed());
/// assert_eq!(tx.principal_value(), 150_000_000);
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    version: u16,
    valid_height: u64,
    tx_uid: UserId,
    fee: u64,
    body: TxBody,
}

impl TransactionBuilder {
    pub fn new(tx_uid: UserId, body: TxBody) -> Self {
        Self {
            version: TX_VERSION,
            valid_height: 0,
            tx_uid,
            fee: 0,
            body,
        }
    }

    pub fn version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn valid_height(mut self, height: u64) -> Self {
        self.valid_height = height;
        self
    }

    /// Leave at zero to have the submission path fill in the minimum.
    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn build(self) -> Transaction {
        Transaction {
            version: self.version,
            valid_height: self.valid_height,
            tx_uid: self.tx_uid,
            fee: self.fee,
            body: self.body,
            signature: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::KeyPair;
    use crate::identity::RegId;

    fn transfer(amount: u64) -> Transaction {
        TransactionBuilder::new(
            RegId::new(10, 1).into(),
            TxBody::CoinTransfer {
                to_uid: RegId::new(20, 2).into(),
                amount,
                memo: b"hi".to_vec(),
            },
        )
        .fee(10_000)
        .valid_height(100)
        .build()
    }

    #[test]
    fn builder_defaults() {
        let tx = TransactionBuilder::new(RegId::new(1, 0).into(), TxBody::BlockReward { reward: 5 })
            .build();
        assert_eq!(tx.version, TX_VERSION);
        assert_eq!(tx.fee, 0);
        assert_eq!(tx.valid_height, 0);
        assert!(!tx.is_signed());
        assert_eq!(tx.kind(), TxKind::BlockReward);
    }

    #[test]
    fn txid_is_deterministic() {
        assert_eq!(transfer(1).txid(), transfer(1).txid());
        assert_ne!(transfer(1).txid(), transfer(2).txid());
    }

    #[test]
    fn txid_ignores_signature() {
        let mut tx = transfer(7);
        let before = tx.txid();
        tx.signature = Some(KeyPair::generate().sign(&tx.signature_hash()));
        assert_eq!(tx.txid(), before);
    }

    #[test]
    fn raw_bytes_are_signable_bytes_plus_signature() {
        let mut tx = transfer(9);
        tx.signature = Some(KeyPair::from_seed(&[4u8; 32]).sign(&tx.signature_hash()));

        let raw = tx.raw_bytes();
        let signable = tx.signable_bytes();
        let sig = bincode::serialize(&tx.signature).unwrap();
        assert_eq!(raw.len(), signable.len() + sig.len());
        assert_eq!(&raw[..signable.len()], signable.as_slice());
        assert_eq!(&raw[signable.len()..], sig.as_slice());
    }

    #[test]
    fn raw_bytes_decode_back() {
        let tx = transfer(11);
        let decoded = Transaction::from_raw_bytes(&tx.raw_bytes()).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(Transaction::from_raw_bytes(&[0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn txid_is_double_sha_of_signable_bytes() {
        let tx = transfer(3);
        assert_eq!(tx.txid().as_bytes(), &double_sha256(&tx.signable_bytes()));
    }
}
