use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};

/// Abstraction for an entity that can sign with the owner's ed25519 key.
/// This allows the SDK to work with:
/// 1. Local keys (backend/CLI)
/// 2. External key custody that only exposes a signing call
///
/// The SDK never reads or stores private key material through this trait.
#[async_trait]
pub trait LumenitosSigner: Send + Sync {
    /// Raw 32-byte ed25519 public key.
    fn public_key(&self) -> [u8; 32];

    /// Sign a message, returning the 64-byte ed25519 signature.
    async fn sign_message(&self, message: &[u8]) -> Result<[u8; 64], String>;

    /// The signer's classic account address (`G...`).
    fn account_address(&self) -> String {
        stellar_strkey::ed25519::PublicKey(self.public_key()).to_string()
    }
}

#[async_trait]
impl LumenitosSigner for SigningKey {
    fn public_key(&self) -> [u8; 32] {
        self.verifying_key().to_bytes()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<[u8; 64], String> {
        Ok(self.sign(message).to_bytes())
    }
}

/// Signature hint: the last four bytes of the public key.
pub fn signature_hint(public_key: &[u8; 32]) -> [u8; 4] {
    let mut hint = [0u8; 4];
    hint.copy_from_slice(&public_key[28..]);
    hint
}
