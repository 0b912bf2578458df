//! Signing capability keyed by public key.

use super::keys::{PrivateKey, PublicKey, Signature};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

/// Anything that can sign a digest on behalf of a public key.
pub trait Wallet {
    fn sign(&self, digest: &[u8; 32], public_key: &PublicKey) -> Result<Signature>;
}

/// In-memory keystore. Keys are imported under a label and looked up by
/// their public key when signing.
#[derive(Debug, Default)]
pub struct Keystore {
    keys: RwLock<IndexMap<String, PrivateKey>>,
}

impl Keystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import a private key (WIF or `PVT_K1_`) under `label`, replacing any
    /// key already stored under that label.
    pub fn import(&self, label: &str, private_key: &str) -> Result<PublicKey> {
        let key: PrivateKey = private_key.parse()?;
        let public_key = key.public_key();
        debug!(label, %public_key, "imported key");
        self.keys.write().insert(label.to_string(), key);
        Ok(public_key)
    }

    /// Public keys in import order.
    pub fn public_keys(&self) -> Vec<PublicKey> {
        self.keys.read().values().map(PrivateKey::public_key).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    pub fn sign_digest(&self, digest: &[u8; 32], public_key: &PublicKey) -> Result<Signature> {
        let keys = self.keys.read();
        let key = keys
            .values()
            .find(|k| k.public_key() == *public_key)
            .ok_or_else(|| Error::KeyNotFound(public_key.to_string()))?;
        key.sign_digest(digest)
    }
}

impl Wallet for Keystore {
    fn sign(&self, digest: &[u8; 32], public_key: &PublicKey) -> Result<Signature> {
        self.sign_digest(digest, public_key)
    }
}

impl Wallet for PrivateKey {
    fn sign(&self, digest: &[u8; 32], public_key: &PublicKey) -> Result<Signature> {
        if self.public_key() != *public_key {
            return Err(Error::KeyNotFound(public_key.to_string()));
        }
        self.sign_digest(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;

    const DEV_WIF: &str = "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3";

    #[test]
    fn test_import_and_sign() {
        let store = Keystore::new();
        let pk = store.import("dev", DEV_WIF).unwrap();
        assert_eq!(store.public_keys(), vec![pk.clone()]);

        let digest = sha256(b"payload");
        let sig = store.sign(&digest, &pk).unwrap();
        assert_eq!(sig.recover(&digest).unwrap(), pk);
    }

    #[test]
    fn test_unknown_key() {
        let store = Keystore::new();
        let other = PrivateKey::generate().public_key();
        let err = store.sign_digest(&[0u8; 32], &other).unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(_)));
    }

    #[test]
    fn test_reimport_replaces_label() {
        let store = Keystore::new();
        store.import("a", DEV_WIF).unwrap();
        let fresh = PrivateKey::generate();
        store.import("a", &fresh.to_wif()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.public_keys(), vec![fresh.public_key()]);
    }

    #[test]
    fn test_bad_import() {
        assert!(Keystore::new().import("x", "garbage").is_err());
    }
}
