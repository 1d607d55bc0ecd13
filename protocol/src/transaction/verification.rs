//! Transaction verification: structural checks and signature validation.
//!
//! The pending pool runs [`verify_structure`] on admission. Signature checks
//! need the sender's registered public key, so [`verify_signature`] takes it
//! explicitly. Checks run cheapest first.

use thiserror::Error;

use super::builder::Transaction;
use super::types::TxBody;
use crate::config::TX_VERSION;
use crate::crypto::keys::PublicKey;
use crate::identity::UserId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during transaction verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("unsupported transaction version {0}")]
    UnsupportedVersion(u16),

    #[error("amount must be > 0")]
    ZeroAmount,

    #[error("sender and receiver must differ: both are {0}")]
    SelfTransfer(String),

    #[error("multisig requires {required} of {signers} signers")]
    InvalidMultisigThreshold { required: u8, signers: usize },

    #[error("transaction is unsigned")]
    MissingSignature,

    #[error("malformed signature: expected 64 bytes, got {0}")]
    MalformedSignature(usize),

    /// The supplied key does not belong to the transaction's sender.
    #[error("public key does not match sender {0}")]
    KeyMismatch(String),

    #[error("invalid signature for sender {0}")]
    InvalidSignature(String),
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Structural checks that need no state.
///
/// 1. **Version** must be known.
/// 2. **Transfers** must move a non-zero amount to someone else.
/// 3. **Multisig** thresholds must be satisfiable.
pub fn verify_structure(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.version == 0 || tx.version > TX_VERSION {
        return Err(TransactionError::UnsupportedVersion(tx.version));
    }

    match &tx.body {
        TxBody::CoinTransfer { to_uid, amount, .. } => {
            if *amount == 0 {
                return Err(TransactionError::ZeroAmount);
            }
            if *to_uid == tx.tx_uid {
                return Err(TransactionError::SelfTransfer(tx.tx_uid.to_string()));
            }
        }
        TxBody::MultisigTransfer {
            signers,
            required,
            amount,
            ..
        } => {
            if *amount == 0 {
                return Err(TransactionError::ZeroAmount);
            }
            if *required == 0 || usize::from(*required) > signers.len() {
                return Err(TransactionError::InvalidMultisigThreshold {
                    required: *required,
                    signers: signers.len(),
                });
            }
        }
        _ => {}
    }

    Ok(())
}

/// Verify the signature against the sender's public key.
///
/// When the sender is named by public key or address hash, `key` must match
/// it. A registered-id sender can only be checked against the key the
/// account store returned for it, which is the caller's job.
pub fn verify_signature(tx: &Transaction, key: &PublicKey) -> Result<(), TransactionError> {
    let signature = tx
        .signature
        .as_ref()
        .ok_or(TransactionError::MissingSignature)?;

    if signature.as_bytes().len() != 64 {
        return Err(TransactionError::MalformedSignature(
            signature.as_bytes().len(),
        ));
    }

    let matches_sender = match &tx.tx_uid {
        UserId::PubKey(pk) => pk == key,
        UserId::KeyId(hash) => *hash == key.address_hash(),
        UserId::RegId(_) => true,
    };
    if !matches_sender {
        return Err(TransactionError::KeyMismatch(tx.tx_uid.to_string()));
    }

    if !key.verify(&tx.signature_hash(), signature) {
        return Err(TransactionError::InvalidSignature(tx.tx_uid.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{KeyPair, Signature};
    use crate::identity::RegId;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::signing::sign_transaction;

    fn signed_transfer() -> (Transaction, KeyPair) {
        let kp = KeyPair::from_seed(&[21u8; 32]);
        let mut tx = TransactionBuilder::new(
            RegId::new(100, 1).into(),
            TxBody::CoinTransfer {
                to_uid: RegId::new(200, 4).into(),
                amount: 150_000_000,
                memo: b"hi".to_vec(),
            },
        )
        .fee(10_000)
        .valid_height(1_000)
        .build();
        sign_transaction(&mut tx, &kp);
        (tx, kp)
    }

    #[test]
    fn valid_transaction_passes() {
        let (tx, kp) = signed_transfer();
        assert!(verify_structure(&tx).is_ok());
        assert!(verify_signature(&tx, &kp.public_key()).is_ok());
    }

    #[test]
    fn mutating_any_field_breaks_the_signature() {
        let (tx, kp) = signed_transfer();
        let pk = kp.public_key();

        let mut t = tx.clone();
        t.fee += 1;
        assert_eq!(
            verify_signature(&t, &pk),
            Err(TransactionError::InvalidSignature(t.tx_uid.to_string()))
        );

        let mut t = tx.clone();
        t.valid_height += 1;
        assert!(verify_signature(&t, &pk).is_err());

        let mut t = tx.clone();
        t.version += 1;
        assert!(verify_signature(&t, &pk).is_err());

        let mut t = tx.clone();
        t.tx_uid = RegId::new(100, 2).into();
        assert!(verify_signature(&t, &pk).is_err());

        let mut t = tx;
        if let TxBody::CoinTransfer { memo, .. } = &mut t.body {
            memo.push(b'!');
        }
        assert!(verify_signature(&t, &pk).is_err());
    }

    #[test]
    fn rejects_unsigned() {
        let (mut tx, kp) = signed_transfer();
        tx.signature = None;
        assert_eq!(
            verify_signature(&tx, &kp.public_key()),
            Err(TransactionError::MissingSignature)
        );
    }

    #[test]
    fn rejects_wrong_key() {
        let (tx, _) = signed_transfer();
        let other = KeyPair::from_seed(&[22u8; 32]);
        assert!(matches!(
            verify_signature(&tx, &other.public_key()),
            Err(TransactionError::InvalidSignature(_))
        ));
    }

    #[test]
    fn pubkey_sender_must_match_key() {
        let kp = KeyPair::from_seed(&[23u8; 32]);
        let other = KeyPair::from_seed(&[24u8; 32]);
        let mut tx = TransactionBuilder::new(
            kp.public_key().into(),
            TxBody::AccountRegister { miner_key: None },
        )
        .build();
        sign_transaction(&mut tx, &other);
        assert!(matches!(
            verify_signature(&tx, &other.public_key()),
            Err(TransactionError::KeyMismatch(_))
        ));
    }

    #[test]
    fn rejects_short_signature() {
        let (mut tx, kp) = signed_transfer();
        let sig = bincode::deserialize::<Signature>(&bincode::serialize(&vec![1u8; 10]).unwrap())
            .unwrap();
        tx.signature = Some(sig);
        assert_eq!(
            verify_signature(&tx, &kp.public_key()),
            Err(TransactionError::MalformedSignature(10))
        );
    }

    #[test]
    fn rejects_zero_amount_and_self_transfer() {
        let zero = TransactionBuilder::new(
            RegId::new(1, 1).into(),
            TxBody::CoinTransfer {
                to_uid: RegId::new(2, 1).into(),
                amount: 0,
                memo: vec![],
            },
        )
        .build();
        assert_eq!(verify_structure(&zero), Err(TransactionError::ZeroAmount));

        let to_self = TransactionBuilder::new(
            RegId::new(1, 1).into(),
            TxBody::CoinTransfer {
                to_uid: RegId::new(1, 1).into(),
                amount: 5,
                memo: vec![],
            },
        )
        .build();
        assert!(matches!(
            verify_structure(&to_self),
            Err(TransactionError::SelfTransfer(_))
        ));
    }

    #[test]
    fn rejects_unsatisfiable_multisig() {
        let tx = TransactionBuilder::new(
            RegId::new(1, 1).into(),
            TxBody::MultisigTransfer {
                signers: vec![RegId::new(1, 1), RegId::new(2, 1)],
                required: 3,
                to_uid: RegId::new(3, 1).into(),
                amount: 10,
                memo: vec![],
            },
        )
        .build();
        assert_eq!(
            verify_structure(&tx),
            Err(TransactionError::InvalidMultisigThreshold {
                required: 3,
                signers: 2
            })
        );
    }

    #[test]
    fn rejects_unknown_version() {
        let (mut tx, _) = signed_transfer();
        tx.version = TX_VERSION + 1;
        assert_eq!(
            verify_structure(&tx),
            Err(TransactionError::UnsupportedVersion(TX_VERSION + 1))
        );
    }
}
