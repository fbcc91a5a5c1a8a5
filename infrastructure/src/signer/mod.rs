//! Replica signing keys.
//!
//! [`Ed25519Signer`] implements the [`Signer`] port. Only the public half ever
//! leaves this module; the ledger registers it as a multisig owner.

use async_trait::async_trait;
use chainbet_application::{Signer, SignerError};
use chainbet_domain::{Digest, ReplicaId};
use ed25519_dalek::{Signature, SigningKey, Verifier, VerifyingKey};
use ed25519_dalek::Signer as _;

const LOCAL_SEED_DOMAIN: &[u8] = b"chainbet/local-seed/v1";

pub struct Ed25519Signer {
    replica: ReplicaId,
    key: SigningKey,
}

impl Ed25519Signer {
    pub fn from_seed(replica: ReplicaId, seed: [u8; 32]) -> Self {
        Self {
            replica,
            key: SigningKey::from_bytes(&seed),
        }
    }

    /// Parse a hex-encoded 32-byte seed (with or without `0x`)
    pub fn from_hex_seed(replica: ReplicaId, seed: &str) -> Result<Self, SignerError> {
        let bytes = hex::decode(seed.trim().trim_start_matches("0x"))
            .map_err(|e| SignerError::KeyUnavailable(format!("seed is not hex: {}", e)))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            SignerError::KeyUnavailable(format!("seed must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Self::from_seed(replica, seed))
    }

    /// Deterministic key for a throwaway local fleet. Never use with real funds.
    pub fn local(replica: ReplicaId) -> Self {
        let seed = Digest::of(&[LOCAL_SEED_DOMAIN, &replica.0.to_be_bytes()]);
        Self::from_seed(replica, *seed.as_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

#[async_trait]
impl Signer for Ed25519Signer {
    fn replica(&self) -> ReplicaId {
        self.replica
    }

    fn public_key(&self) -> Vec<u8> {
        self.key.verifying_key().to_bytes().to_vec()
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

/// Decode a hex-encoded ed25519 public key
pub fn parse_public_key(encoded: &str) -> Result<VerifyingKey, String> {
    let bytes = hex::decode(encoded.trim().trim_start_matches("0x"))
        .map_err(|e| format!("not hex: {}", e))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("expected 32 bytes, got {}", b.len()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| e.to_string())
}

/// Check `signature` over `message` against `key`
pub fn verify(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> bool {
    Signature::from_slice(signature)
        .map(|signature| key.verify(message, &signature).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signature_verifies_under_public_key() {
        let signer = Ed25519Signer::local(ReplicaId(1));
        let signature = signer.sign(b"round #1").await.unwrap();

        let key = parse_public_key(&hex::encode(signer.public_key())).unwrap();
        assert!(verify(&key, b"round #1", &signature));
        assert!(!verify(&key, b"round #2", &signature));
        assert!(!verify(&key, b"round #1", &signature[..10]));
    }

    #[test]
    fn test_local_keys_are_distinct_and_stable() {
        let a = Ed25519Signer::local(ReplicaId(0));
        let b = Ed25519Signer::local(ReplicaId(1));
        assert_ne!(a.public_key(), b.public_key());
        assert_eq!(a.public_key(), Ed25519Signer::local(ReplicaId(0)).public_key());
    }

    #[test]
    fn test_hex_seed() {
        let seed = "0x".to_string() + &"11".repeat(32);
        let signer = Ed25519Signer::from_hex_seed(ReplicaId(2), &seed).unwrap();
        assert_eq!(
            signer.public_key(),
            Ed25519Signer::from_seed(ReplicaId(2), [0x11; 32]).public_key()
        );
        assert!(Ed25519Signer::from_hex_seed(ReplicaId(2), "abcd").is_err());
    }

    #[test]
    fn test_parse_public_key_rejects_garbage() {
        assert!(parse_public_key("zz").is_err());
        assert!(parse_public_key(&"00".repeat(31)).is_err());
    }
}
