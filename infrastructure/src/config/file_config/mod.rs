//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly; conversion into application settings
//! happens only after [`FileConfig::validate`] passes.

mod ledger;
mod oracle;
mod replica;
mod round;

pub use ledger::FileLedgerConfig;
pub use oracle::{FileOracleConfig, FileTokenEndpoint};
pub use replica::{FileParticipant, FileQuorumConfig, FileReplicaConfig};
pub use round::{FileJournalConfig, FilePrizeConfig, FileRoundConfig};

use crate::signer::{Ed25519Signer, parse_public_key};
use chainbet_application::{ReplicaSettings, Signer};
use chainbet_domain::{
    Address, AgreementParams, PayloadContext, PrizePolicy, QuorumRule, ReplicaId,
};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("no participants configured")]
    NoParticipants,

    #[error("participant {0} is listed more than once")]
    DuplicateParticipant(u32),

    #[error("replica {0} is not in the participant set")]
    UnknownReplica(u32),

    #[error("participant {id}: invalid public key ({reason})")]
    InvalidPublicKey { id: u32, reason: String },

    #[error("replica key seed is invalid: {0}")]
    InvalidKeySeed(String),

    #[error("signature threshold {threshold} must satisfy 2n/3 < t <= n for n = {participants}")]
    InvalidThreshold { threshold: usize, participants: usize },

    #[error("quorum rule: {0}")]
    InvalidQuorumRule(String),

    #[error("{field}: invalid address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} cannot be 0")]
    InvalidTimeout(&'static str),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub replica: FileReplicaConfig,
    pub participants: Vec<FileParticipant>,
    pub quorum: FileQuorumConfig,
    pub oracle: FileOracleConfig,
    pub ledger: FileLedgerConfig,
    pub round: FileRoundConfig,
    pub prize: FilePrizeConfig,
    pub journal: FileJournalConfig,
}

impl FileConfig {
    /// Fill an empty participant set with `count` locally derived keys
    pub fn with_local_participants(mut self, count: u32) -> Self {
        if self.participants.is_empty() {
            self.participants = (0..count)
                .map(|id| FileParticipant {
                    id,
                    public_key: hex::encode(Ed25519Signer::local(ReplicaId(id)).public_key()),
                })
                .collect();
        }
        self
    }

    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        // 1. Participant set
        if self.participants.is_empty() {
            issues.push(ConfigValidationError::NoParticipants);
        }
        let mut seen = BTreeSet::new();
        for participant in &self.participants {
            if !seen.insert(participant.id) {
                issues.push(ConfigValidationError::DuplicateParticipant(participant.id));
            }
            if let Err(reason) = parse_public_key(&participant.public_key) {
                issues.push(ConfigValidationError::InvalidPublicKey {
                    id: participant.id,
                    reason,
                });
            }
        }
        if !self.participants.is_empty() && !seen.contains(&self.replica.id) {
            issues.push(ConfigValidationError::UnknownReplica(self.replica.id));
        }
        if let Some(seed) = &self.replica.key_seed
            && let Err(e) = Ed25519Signer::from_hex_seed(ReplicaId(self.replica.id), seed)
        {
            issues.push(ConfigValidationError::InvalidKeySeed(e.to_string()));
        }

        // 2. Quorum and threshold
        if let Err(e) = self.agreement_params()
            && e != ConfigValidationError::NoParticipants
        {
            issues.push(e);
        }

        // 3. Addresses
        for (field, value) in [
            ("ledger.safe", &self.ledger.safe),
            ("ledger.betting_contract", &self.ledger.betting_contract),
            ("ledger.multisend", &self.ledger.multisend),
        ] {
            if value.parse::<Address>().is_err() {
                issues.push(ConfigValidationError::InvalidAddress {
                    field,
                    value: value.clone(),
                });
            }
        }

        // 4. Timeouts
        for (field, value) in [
            ("round.timeout_seconds", self.round.timeout_seconds),
            ("round.confirmation_poll_ms", self.round.confirmation_poll_ms),
            ("oracle.request_timeout_seconds", self.oracle.request_timeout_seconds),
            ("oracle.max_attempts", u64::from(self.oracle.max_attempts)),
        ] {
            if value == 0 {
                issues.push(ConfigValidationError::InvalidTimeout(field));
            }
        }

        issues
    }

    pub fn participant_ids(&self) -> Vec<ReplicaId> {
        self.participants.iter().map(|p| ReplicaId(p.id)).collect()
    }

    /// Owner keys the multisig checks signatures against
    pub fn participant_keys(&self) -> Result<BTreeMap<ReplicaId, VerifyingKey>, ConfigValidationError> {
        self.participants
            .iter()
            .map(|p| {
                parse_public_key(&p.public_key)
                    .map(|key| (ReplicaId(p.id), key))
                    .map_err(|reason| ConfigValidationError::InvalidPublicKey { id: p.id, reason })
            })
            .collect()
    }

    pub fn agreement_params(&self) -> Result<AgreementParams, ConfigValidationError> {
        let n = self.participants.len();
        if n == 0 {
            return Err(ConfigValidationError::NoParticipants);
        }
        let rule = self
            .quorum
            .parse_rule()
            .map_err(ConfigValidationError::InvalidQuorumRule)?;
        let quorum = rule.min_needed(n);
        if quorum == 0 || quorum > n {
            return Err(ConfigValidationError::InvalidQuorumRule(format!(
                "{} needs {} of {} participants",
                rule, quorum, n
            )));
        }

        let threshold = self
            .quorum
            .signature_threshold
            .unwrap_or_else(|| QuorumRule::Byzantine.min_needed(n));
        if threshold * 3 <= n * 2 || threshold > n {
            return Err(ConfigValidationError::InvalidThreshold {
                threshold,
                participants: n,
            });
        }

        Ok(AgreementParams {
            quorum,
            signature_threshold: threshold,
        })
    }

    pub fn payload_context(&self) -> Result<PayloadContext, ConfigValidationError> {
        let parse = |field: &'static str, value: &str| {
            value
                .parse::<Address>()
                .map_err(|_| ConfigValidationError::InvalidAddress {
                    field,
                    value: value.to_string(),
                })
        };
        let threshold = self.agreement_params().map_or(0, |p| p.signature_threshold);
        Ok(PayloadContext {
            safe: parse("ledger.safe", &self.ledger.safe)?,
            betting_contract: parse("ledger.betting_contract", &self.ledger.betting_contract)?,
            multisend: parse("ledger.multisend", &self.ledger.multisend)?,
            starting_nonce: self.ledger.starting_nonce,
            signature_threshold: threshold,
        })
    }

    pub fn prize_policy(&self) -> PrizePolicy {
        PrizePolicy::new(self.prize.holders_per_unit)
    }

    /// Settings for the configured replica, after validation
    pub fn replica_settings(&self) -> Result<ReplicaSettings, Vec<ConfigValidationError>> {
        let issues = self.validate();
        if !issues.is_empty() {
            return Err(issues);
        }
        let agreement = self.agreement_params().map_err(|e| vec![e])?;
        let payload = self.payload_context().map_err(|e| vec![e])?;

        Ok(
            ReplicaSettings::new(ReplicaId(self.replica.id), payload, agreement)
                .with_prize(self.prize_policy())
                .with_rounds(self.round.to_round_params())
                .with_retry(self.oracle.retry_policy()),
        )
    }
}
