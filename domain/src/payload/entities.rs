//! Payload, signature share and signed payload

use super::encoding::CallOperation;
use crate::core::hash::{Address, Digest, PayloadHash};
use crate::core::ids::{ReplicaId, RoundIndex};
use serde::{Deserialize, Serialize};

const PAYLOAD_DOMAIN: &[u8] = b"chainbet/payload/v1";
const SIGNING_DOMAIN: &[u8] = b"chainbet/sign/v1";

/// Static parameters every replica uses to build the same payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadContext {
    /// Multisig wallet executing the transaction
    pub safe: Address,
    pub betting_contract: Address,
    pub multisend: Address,
    /// Nonce of round #0; round `i` uses `starting_nonce + i`
    pub starting_nonce: u64,
    pub signature_threshold: usize,
}

/// A multisig-ready transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub round: RoundIndex,
    pub safe: Address,
    pub target: Address,
    pub value: u128,
    pub operation: CallOperation,
    #[serde(with = "hex_bytes")]
    pub call_data: Vec<u8>,
    pub nonce: u64,
    pub signature_threshold: usize,
}

impl TransactionPayload {
    /// Canonical hash over every field
    pub fn hash(&self) -> PayloadHash {
        Digest::of(&[
            PAYLOAD_DOMAIN,
            &self.round.0.to_be_bytes(),
            self.safe.as_bytes(),
            self.target.as_bytes(),
            &self.value.to_be_bytes(),
            &[self.operation.code()],
            &(self.call_data.len() as u64).to_be_bytes(),
            &self.call_data,
            &self.nonce.to_be_bytes(),
            &(self.signature_threshold as u64).to_be_bytes(),
        ])
    }
}

/// Bytes a replica signs: scoped to one round and one payload hash so a
/// signature can never be replayed in another round.
pub fn signing_bytes(round: RoundIndex, payload_hash: &PayloadHash) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(SIGNING_DOMAIN.len() + 8 + 32);
    bytes.extend_from_slice(SIGNING_DOMAIN);
    bytes.extend_from_slice(&round.0.to_be_bytes());
    bytes.extend_from_slice(payload_hash.as_bytes());
    bytes
}

/// One replica's signature over a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureShare {
    pub replica: ReplicaId,
    pub round: RoundIndex,
    pub payload_hash: PayloadHash,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

/// Threshold signature set agreed through the substrate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    pub round: RoundIndex,
    pub payload_hash: PayloadHash,
    /// Sorted by replica id, one share per replica
    pub signatures: Vec<SignatureShare>,
}

impl SignedPayload {
    pub fn signers(&self) -> impl Iterator<Item = ReplicaId> + '_ {
        self.signatures.iter().map(|s| s.replica)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Whether this signature set covers `payload`
    pub fn covers(&self, payload: &TransactionPayload) -> bool {
        self.round == payload.round
            && self.payload_hash == payload.hash()
            && self
                .signatures
                .iter()
                .all(|s| s.round == self.round && s.payload_hash == self.payload_hash)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
