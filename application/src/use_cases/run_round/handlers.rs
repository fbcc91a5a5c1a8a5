//! Phase handlers for the RunRound use case.
//!
//! Every handler first asks the substrate whether its slot is already agreed,
//! so a replica that restarts mid-round rejoins without re-proposing.

use super::{RoundError, RunRoundUseCase};
use crate::ports::round_logger::RoundEvent;
use crate::ports::substrate::SubstrateError;
use chainbet_domain::{
    Agreement, ConsensusPhase, Proposal, Round, RoundOutcome, RoundPhase, SubmissionStatus, decide,
};
use serde_json::json;
use tracing::{debug, info, warn};

impl RunRoundUseCase {
    /// Value already agreed for a slot, if any.
    async fn already_agreed(
        &self,
        round: &Round,
        phase: ConsensusPhase,
    ) -> Result<Option<Agreement>, RoundError> {
        let agreement = self.substrate.agreed(round.index(), phase).await?;
        if agreement.is_some() {
            debug!(
                "{} round {}: {} already agreed",
                self.settings.replica,
                round.index(),
                phase
            );
        }
        Ok(agreement)
    }

    /// Propose the local value (if any) and wait for the slot's agreement.
    async fn propose_and_wait(
        &self,
        round: &Round,
        phase: ConsensusPhase,
        local: Option<Proposal>,
    ) -> Result<Agreement, RoundError> {
        let index = round.index();
        if let Some(proposal) = local {
            self.substrate
                .propose(self.settings.replica, index, proposal)
                .await?;
        }
        let agreement = self.substrate.wait_agreed(index, phase).await?;

        self.logger.log(RoundEvent::new(
            "agreed",
            json!({
                "replica": self.settings.replica,
                "round": index,
                "value": agreement,
            }),
        ));
        Ok(agreement)
    }

    pub(super) async fn collect_facts(&self, round: &mut Round) -> Result<(), RoundError> {
        let agreement = match self.already_agreed(round, ConsensusPhase::Facts).await? {
            Some(agreement) => agreement,
            None => {
                let observation = self.facts.observe().await?;
                round.record_fact(self.settings.replica, observation.clone());
                let proposal = Some(Proposal::Facts(observation));
                self.propose_and_wait(round, ConsensusPhase::Facts, proposal)
                    .await?
            }
        };

        let observation = agreement
            .into_facts()
            .ok_or_else(|| mismatched_slot(ConsensusPhase::Facts))?;
        info!(
            "{} round {}: facts agreed (arbitrum {}, base {})",
            self.settings.replica,
            round.index(),
            observation.arbitrum.holders,
            observation.base.holders
        );
        round.set_agreed_facts(observation)?;
        round.advance(RoundPhase::FactsAgreed)?;
        Ok(())
    }

    pub(super) fn decide(&self, round: &mut Round) -> Result<(), RoundError> {
        let observation = round
            .agreed_facts()
            .ok_or(RoundError::MissingState("agreed facts"))?;
        let decision = decide(observation, &self.settings.prize);
        info!(
            "{} round {}: winner {}, verdict {}, prize {}",
            self.settings.replica,
            round.index(),
            decision
                .winning_chain
                .map(|c| c.as_str())
                .unwrap_or("none (tie)"),
            decision.verdict,
            decision.prize_amount
        );

        let requires_settlement = decision.requires_settlement();
        round.set_decision(decision)?;
        if requires_settlement {
            round.advance(RoundPhase::BuildTx)?;
        } else {
            round.confirm(RoundOutcome::NoAction {
                reason: "no pending bet".to_string(),
            })?;
        }
        Ok(())
    }

    pub(super) async fn build_tx(&self, round: &mut Round) -> Result<(), RoundError> {
        let index = round.index();
        let decision = round
            .decision()
            .ok_or(RoundError::MissingState("decision"))?
            .clone();

        let agreement = match self.already_agreed(round, ConsensusPhase::Payload).await? {
            Some(agreement) => agreement,
            None => {
                let payload = self.coordinator.build_payload(&decision, index).ok_or_else(|| {
                    RoundError::InvalidPayload("decision has nothing to settle".to_string())
                })?;
                let proposal = Some(Proposal::Payload(payload));
                self.propose_and_wait(round, ConsensusPhase::Payload, proposal)
                    .await?
            }
        };

        let payload = agreement
            .into_payload()
            .ok_or_else(|| mismatched_slot(ConsensusPhase::Payload))?;
        info!(
            "{} round {}: payload {} agreed (nonce {})",
            self.settings.replica,
            index,
            payload.hash().short(),
            payload.nonce
        );
        round.set_payload(payload)?;
        round.advance(RoundPhase::CollectSignatures)?;
        Ok(())
    }

    pub(super) async fn collect_signatures(&self, round: &mut Round) -> Result<(), RoundError> {
        let index = round.index();
        let payload = round
            .payload()
            .ok_or(RoundError::MissingState("payload"))?
            .clone();
        let decision = round
            .decision()
            .ok_or(RoundError::MissingState("decision"))?
            .clone();

        let agreement = match self.already_agreed(round, ConsensusPhase::Signatures).await? {
            Some(agreement) => agreement,
            None => {
                let proposal = match self.coordinator.verify_payload(&payload, &decision) {
                    Ok(()) => {
                        let share = self.coordinator.collect_signature(&payload).await?;
                        round.record_signature(share.clone());
                        Some(Proposal::Signature(share))
                    }
                    Err(e) => {
                        // Refuse to sign; other replicas may still reach the threshold
                        warn!("{} round {}: {}", self.settings.replica, index, e);
                        self.logger.log(RoundEvent::new(
                            "sign_refused",
                            json!({
                                "replica": self.settings.replica,
                                "round": index,
                                "reason": e.to_string(),
                            }),
                        ));
                        None
                    }
                };
                self.propose_and_wait(round, ConsensusPhase::Signatures, proposal)
                    .await?
            }
        };

        let signed = agreement
            .into_signatures()
            .ok_or_else(|| mismatched_slot(ConsensusPhase::Signatures))?;
        if !signed.covers(&payload) {
            return Err(RoundError::InvalidPayload(format!(
                "agreed signatures cover {}, not the agreed payload {}",
                signed.payload_hash.short(),
                payload.hash().short()
            )));
        }
        info!(
            "{} round {}: {} signatures agreed",
            self.settings.replica,
            index,
            signed.len()
        );
        round.set_signed(signed)?;
        round.advance(RoundPhase::SignaturesAgreed)?;
        Ok(())
    }

    pub(super) async fn submit(&self, round: &mut Round) -> Result<(), RoundError> {
        let index = round.index();
        let payload = round
            .payload()
            .ok_or(RoundError::MissingState("payload"))?
            .clone();
        let signed = round
            .signed()
            .ok_or(RoundError::MissingState("signed payload"))?
            .clone();

        let tx_hash = self.coordinator.submit(&payload, &signed).await?;
        round.set_submission(SubmissionStatus::Submitted);

        match tx_hash {
            Some(tx_hash) => {
                let receipt = self.coordinator.confirm(index, tx_hash, payload.nonce).await?;
                round.confirm(RoundOutcome::Settled { receipt })?;
            }
            None => {
                round.set_submission(SubmissionStatus::Confirmed);
                round.confirm(RoundOutcome::NoAction {
                    reason: "nonce already resolved on the ledger".to_string(),
                })?;
            }
        }
        Ok(())
    }
}

fn mismatched_slot(phase: ConsensusPhase) -> RoundError {
    RoundError::Substrate(SubstrateError::Rejected(format!(
        "{} slot delivered a value of another phase",
        phase
    )))
}
