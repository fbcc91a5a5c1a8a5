//! Signer port
//!
//! Each replica owns one key. The core only ever sees signatures and the
//! public key; the private key stays behind this interface.

use async_trait::async_trait;
use chainbet_domain::ReplicaId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("Signing key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Signing failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Signer: Send + Sync {
    /// Replica this key belongs to
    fn replica(&self) -> ReplicaId;

    fn public_key(&self) -> Vec<u8>;

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;
}
