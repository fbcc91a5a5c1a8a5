//! Round entity

use super::phase::{RoundFailure, RoundPhase};
use crate::chain::Observation;
use crate::core::error::DomainError;
use crate::core::ids::{ReplicaId, RoundIndex};
use crate::decision::engine::Decision;
use crate::payload::entities::{SignatureShare, SignedPayload, TransactionPayload};
use crate::submission::{Receipt, SubmissionStatus};
use crate::util::WriteOnce;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a confirmed round ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundOutcome {
    /// A transaction was finalized on the ledger
    Settled { receipt: Receipt },
    /// Nothing to settle this round
    NoAction { reason: String },
}

impl RoundOutcome {
    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            RoundOutcome::Settled { receipt } => Some(receipt),
            RoundOutcome::NoAction { .. } => None,
        }
    }
}

/// One decision cycle as seen by one replica.
///
/// Agreed facts, decision, payload and signed payload are write-once. The
/// collected maps only hold local bookkeeping until the matching agreement
/// arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    index: RoundIndex,
    phase: RoundPhase,
    started_at: DateTime<Utc>,
    collected_facts: BTreeMap<ReplicaId, Observation>,
    agreed_facts: WriteOnce<Observation>,
    decision: WriteOnce<Decision>,
    payload: WriteOnce<TransactionPayload>,
    signatures: BTreeMap<ReplicaId, SignatureShare>,
    signed: WriteOnce<SignedPayload>,
    submission: Option<SubmissionStatus>,
    outcome: Option<RoundOutcome>,
    failure: Option<RoundFailure>,
}

impl Round {
    pub fn new(index: RoundIndex) -> Self {
        Self {
            index,
            phase: RoundPhase::CollectFacts,
            started_at: Utc::now(),
            collected_facts: BTreeMap::new(),
            agreed_facts: WriteOnce::new(),
            decision: WriteOnce::new(),
            payload: WriteOnce::new(),
            signatures: BTreeMap::new(),
            signed: WriteOnce::new(),
            submission: None,
            outcome: None,
            failure: None,
        }
    }

    // ==================== Accessors ====================

    pub fn index(&self) -> RoundIndex {
        self.index
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn collected_facts(&self) -> &BTreeMap<ReplicaId, Observation> {
        &self.collected_facts
    }

    pub fn agreed_facts(&self) -> Option<&Observation> {
        self.agreed_facts.get()
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.get()
    }

    pub fn payload(&self) -> Option<&TransactionPayload> {
        self.payload.get()
    }

    pub fn signatures(&self) -> &BTreeMap<ReplicaId, SignatureShare> {
        &self.signatures
    }

    pub fn signed(&self) -> Option<&SignedPayload> {
        self.signed.get()
    }

    pub fn submission(&self) -> Option<SubmissionStatus> {
        self.submission
    }

    pub fn outcome(&self) -> Option<&RoundOutcome> {
        self.outcome.as_ref()
    }

    pub fn failure(&self) -> Option<&RoundFailure> {
        self.failure.as_ref()
    }

    // ==================== Transitions ====================

    /// Move to `next`, rejecting anything the state machine does not allow.
    pub fn advance(&mut self, next: RoundPhase) -> Result<(), DomainError> {
        if !self.phase.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                round: self.index.value(),
                from: self.phase.as_str(),
                to: next.as_str(),
            });
        }
        self.phase = next;
        Ok(())
    }

    pub fn confirm(&mut self, outcome: RoundOutcome) -> Result<(), DomainError> {
        self.advance(RoundPhase::Confirmed)?;
        if let Some(receipt) = outcome.receipt() {
            debug_assert_eq!(receipt.round, self.index);
            self.submission = Some(SubmissionStatus::Confirmed);
        }
        self.outcome = Some(outcome);
        Ok(())
    }

    /// Abandon the round. The failure keeps the phase it happened in.
    pub fn fail(&mut self, failure: RoundFailure) -> Result<(), DomainError> {
        self.advance(RoundPhase::Failed)?;
        self.failure = Some(failure);
        Ok(())
    }

    // ==================== Collected values ====================

    pub fn record_fact(&mut self, replica: ReplicaId, observation: Observation) {
        self.collected_facts.insert(replica, observation);
    }

    /// Keep a signature share only if it belongs to this round.
    pub fn record_signature(&mut self, share: SignatureShare) -> bool {
        if share.round != self.index {
            return false;
        }
        self.signatures.insert(share.replica, share);
        true
    }

    pub fn set_submission(&mut self, status: SubmissionStatus) {
        self.submission = Some(status);
    }

    // ==================== Write-once values ====================

    pub fn set_agreed_facts(&mut self, observation: Observation) -> Result<(), DomainError> {
        self.write(|round| round.agreed_facts.set(observation), "agreed_facts")
    }

    pub fn set_decision(&mut self, decision: Decision) -> Result<(), DomainError> {
        self.write(|round| round.decision.set(decision), "decision")
    }

    pub fn set_payload(&mut self, payload: TransactionPayload) -> Result<(), DomainError> {
        self.write(|round| round.payload.set(payload), "payload")
    }

    pub fn set_signed(&mut self, signed: SignedPayload) -> Result<(), DomainError> {
        self.write(|round| round.signed.set(signed), "signed_payload")
    }

    fn write(
        &mut self,
        set: impl FnOnce(&mut Self) -> bool,
        field: &'static str,
    ) -> Result<(), DomainError> {
        if set(self) {
            Ok(())
        } else {
            Err(DomainError::AlreadySet {
                round: self.index.value(),
                field,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Fact;
    use crate::core::hash::Digest;
    use crate::round::phase::FailureKind;
    use chrono::TimeZone;

    fn observation(arbitrum: u64, base: u64) -> Observation {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        Observation::new(
            Fact::new(crate::chain::Chain::Arbitrum, arbitrum, at),
            Fact::new(crate::chain::Chain::Base, base, at),
            None,
            0,
        )
    }

    #[test]
    fn test_agreed_facts_are_write_once() {
        let mut round = Round::new(RoundIndex(2));
        round.set_agreed_facts(observation(1000, 1200)).unwrap();
        // Re-entering the phase with identical input is fine
        round.set_agreed_facts(observation(1000, 1200)).unwrap();

        let err = round.set_agreed_facts(observation(1000, 1300)).unwrap_err();
        assert_eq!(
            err,
            DomainError::AlreadySet {
                round: 2,
                field: "agreed_facts"
            }
        );
        assert_eq!(round.agreed_facts().unwrap().base.holders, 1200);
    }

    #[test]
    fn test_advance_rejects_skips() {
        let mut round = Round::new(RoundIndex(0));
        let err = round.advance(RoundPhase::Decide).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));

        round.advance(RoundPhase::FactsAgreed).unwrap();
        round.advance(RoundPhase::Decide).unwrap();
        assert_eq!(round.phase(), RoundPhase::Decide);
    }

    #[test]
    fn test_signature_from_other_round_is_dropped() {
        let mut round = Round::new(RoundIndex(5));
        let hash = Digest::of(&[b"payload"]);
        let foreign = SignatureShare {
            replica: ReplicaId(1),
            round: RoundIndex(4),
            payload_hash: hash,
            signature: vec![1, 2, 3],
        };
        assert!(!round.record_signature(foreign));
        assert!(round.signatures().is_empty());

        let local = SignatureShare {
            replica: ReplicaId(1),
            round: RoundIndex(5),
            payload_hash: hash,
            signature: vec![1, 2, 3],
        };
        assert!(round.record_signature(local));
        assert_eq!(round.signatures().len(), 1);
    }

    #[test]
    fn test_fail_then_nothing() {
        let mut round = Round::new(RoundIndex(1));
        round
            .fail(RoundFailure::new(
                FailureKind::OracleUnavailable,
                RoundPhase::CollectFacts,
                "explorer down",
            ))
            .unwrap();
        assert!(round.is_terminal());
        assert_eq!(round.failure().unwrap().kind, FailureKind::OracleUnavailable);
        assert!(round.advance(RoundPhase::FactsAgreed).is_err());
        assert!(
            round
                .confirm(RoundOutcome::NoAction {
                    reason: "late".to_string()
                })
                .is_err()
        );
    }

    #[test]
    fn test_confirm_with_receipt_marks_submission() {
        let mut round = Round::new(RoundIndex(1));
        for phase in [
            RoundPhase::FactsAgreed,
            RoundPhase::Decide,
            RoundPhase::BuildTx,
            RoundPhase::CollectSignatures,
            RoundPhase::SignaturesAgreed,
            RoundPhase::Submit,
        ] {
            round.advance(phase).unwrap();
        }
        round
            .confirm(RoundOutcome::Settled {
                receipt: Receipt {
                    round: RoundIndex(1),
                    tx_hash: Digest::of(&[b"tx"]),
                    nonce: 8,
                    final_block: Some(12),
                },
            })
            .unwrap();
        assert_eq!(round.submission(), Some(SubmissionStatus::Confirmed));
        assert_eq!(round.outcome().unwrap().receipt().unwrap().nonce, 8);
    }
}
