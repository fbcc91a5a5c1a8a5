//! Round phases and failure taxonomy

use serde::{Deserialize, Serialize};

/// State of a round on one replica
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Observe holder counts and propose them
    CollectFacts,
    /// The substrate delivered the canonical observation
    FactsAgreed,
    /// Compute the decision from agreed facts
    Decide,
    /// Build the payload and agree on it
    BuildTx,
    /// Verify and sign the agreed payload, agree on the signature set
    CollectSignatures,
    /// Threshold signatures agreed
    SignaturesAgreed,
    /// Submit once and wait for finality
    Submit,
    /// Terminal success
    Confirmed,
    /// Terminal failure
    Failed,
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundPhase::CollectFacts => "collect_facts",
            RoundPhase::FactsAgreed => "facts_agreed",
            RoundPhase::Decide => "decide",
            RoundPhase::BuildTx => "build_tx",
            RoundPhase::CollectSignatures => "collect_signatures",
            RoundPhase::SignaturesAgreed => "signatures_agreed",
            RoundPhase::Submit => "submit",
            RoundPhase::Confirmed => "confirmed",
            RoundPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundPhase::Confirmed | RoundPhase::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    ///
    /// Rounds move strictly forward; `Decide` may finish the round directly
    /// when there is nothing to settle, and any non-terminal phase may fail.
    pub fn can_transition_to(&self, next: RoundPhase) -> bool {
        use RoundPhase::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (CollectFacts, FactsAgreed)
            | (FactsAgreed, Decide)
            | (Decide, BuildTx)
            | (Decide, Confirmed)
            | (BuildTx, CollectSignatures)
            | (CollectSignatures, SignaturesAgreed)
            | (SignaturesAgreed, Submit)
            | (Submit, Confirmed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a round failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network calls kept failing after the retry budget
    TransientNetwork,
    /// Holder counts could not be fetched; retried next cycle
    OracleUnavailable,
    /// The substrate did not deliver agreement before the round deadline
    ConsensusTimeout,
    /// The payload proposed for signing did not match local recomputation
    InvalidPayload,
    /// The ledger rejected the transaction; needs operator attention
    PermanentLedger,
    /// Local journal could not be read or written
    Storage,
    /// Refused to sign a second payload for the same round
    DoubleSign,
    /// The signing key could not be used
    SignerUnavailable,
    /// Service shut down mid-round
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TransientNetwork => "transient_network",
            FailureKind::OracleUnavailable => "oracle_unavailable",
            FailureKind::ConsensusTimeout => "consensus_timeout",
            FailureKind::InvalidPayload => "invalid_payload",
            FailureKind::PermanentLedger => "permanent_ledger",
            FailureKind::Storage => "storage",
            FailureKind::DoubleSign => "double_sign",
            FailureKind::SignerUnavailable => "signer_unavailable",
            FailureKind::Cancelled => "cancelled",
        }
    }

    /// Whether the operator must step in before rounds can make progress
    pub fn needs_operator(&self) -> bool {
        matches!(
            self,
            FailureKind::PermanentLedger | FailureKind::Storage | FailureKind::SignerUnavailable
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure details recorded on a failed round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundFailure {
    pub kind: FailureKind,
    /// Phase the round was in when it failed
    pub phase: RoundPhase,
    pub message: String,
}

impl RoundFailure {
    pub fn new(kind: FailureKind, phase: RoundPhase, message: impl Into<String>) -> Self {
        Self {
            kind,
            phase,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RoundFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} during {}: {}", self.kind, self.phase, self.message)
    }
}
