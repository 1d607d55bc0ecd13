//! Transaction signing with Ed25519 keypairs.
//!
//! Signing is a separate step from building because the key usually lives
//! in a wallet, not next to the code assembling the transaction. The
//! signed message is always [`Transaction::signature_hash`].

use super::builder::Transaction;
use crate::crypto::keys::KeyPair;

/// Signs a transaction in place, overwriting any previous signature.
///
/// The caller is responsible for making sure `keypair` belongs to
/// `tx.tx_uid`; the signature is checked against the account's registered
/// key later, not here.
///
/// ```
/// use txgate_protocol::crypto::keys::KeyPair;
/// use txgate_protocol::transaction::{sign_transaction, TransactionBuilder, TxBody};
///
/// let keypair = KeyPair::generate();
/// let mut tx = TransactionBuilder::new(
///     keypair.public_key().into(),
///     TxBody::AccountRegister { miner_key: None },
/// )
/// .build();
///
/// sign_transaction(&mut tx, &keypair);
/// assert!(tx.is_signed());
/// ```
pub fn sign_transaction<'a>(tx: &'a mut Transaction, keypair: &KeyPair) -> &'a Transaction {
    let hash = tx.signature_hash();
    tx.signature = Some(keypair.sign(&hash));
    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::RegId;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::types::TxBody;

    fn invoke() -> Transaction {
        TransactionBuilder::new(
            RegId::new(3, 1).into(),
            TxBody::ContractInvoke {
                app_uid: RegId::new(2, 0).into(),
                amount: 1_000,
                arguments: vec![0xde, 0xad],
            },
        )
        .fee(100_000)
        .build()
    }

    #[test]
    fn sign_sets_signature_field() {
        let kp = KeyPair::generate();
        let mut tx = invoke();
        assert!(!tx.is_signed());
        sign_transaction(&mut tx, &kp);
        assert!(tx.is_signed());
    }

    #[test]
    fn signature_is_64_bytes() {
        let kp = KeyPair::generate();
        let mut tx = invoke();
        sign_transaction(&mut tx, &kp);
        assert_eq!(tx.signature.as_ref().unwrap().as_bytes().len(), 64);
    }

    #[test]
    fn signing_does_not_change_txid() {
        let kp = KeyPair::generate();
        let mut tx = invoke();
        let before = tx.txid();
        sign_transaction(&mut tx, &kp);
        assert_eq!(tx.txid(), before);
    }

    #[test]
    fn signing_is_deterministic() {
        let kp = KeyPair::from_seed(&[8u8; 32]);
        let mut a = invoke();
        let mut b = invoke();
        sign_transaction(&mut a, &kp);
        sign_transaction(&mut b, &kp);
        assert_eq!(a.signature, b.signature);
    }
}
