//! Keys, signatures, and the signing capability.

mod keys;
mod wallet;

pub use keys::{PrivateKey, PublicKey, Signature, sha256};
pub use wallet::{Keystore, Wallet};

/// A freshly generated keypair.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

/// Generate a random keypair.
pub fn generate_key() -> KeyPair {
    let private_key = PrivateKey::generate();
    let public_key = private_key.public_key();
    KeyPair {
        private_key,
        public_key,
    }
}

/// Recover the signer of `digest`.
pub fn recover(digest: &[u8; 32], signature: &Signature) -> crate::Result<PublicKey> {
    signature.recover(digest)
}
