//! Run Round use case
//!
//! Drives one round on one replica from `COLLECT_FACTS` to a terminal state:
//!
//! 1. Collect facts: observe, propose, wait for the agreed observation
//! 2. Decide: pure decision from the agreed observation
//! 3. Build tx: propose the local payload, wait for the agreed payload
//! 4. Collect signatures: verify, sign, wait for the threshold set
//! 5. Submit: submit once, wait for finality
//!
//! Each phase has one handler (see `handlers.rs`), dispatched by matching on
//! the round's phase. A phase only advances on a value the substrate agreed
//! on. The whole round shares one deadline; when it passes the round fails and
//! the next round starts fresh.

mod handlers;
mod types;

pub use types::{ReplicaPorts, RoundError};

use crate::config::ReplicaSettings;
use crate::ports::progress::{NoProgress, RoundProgressNotifier};
use crate::ports::round_logger::{RoundEvent, RoundEventLogger};
use crate::ports::substrate::ConsensusSubstrate;
use crate::use_cases::collect_facts::CollectFactsUseCase;
use crate::use_cases::coordinate_tx::TransactionCoordinator;
use chainbet_domain::{FailureKind, Round, RoundFailure, RoundPhase};
use serde_json::json;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Use case for driving a single round
pub struct RunRoundUseCase {
    pub(super) settings: ReplicaSettings,
    pub(super) facts: CollectFactsUseCase,
    pub(super) coordinator: TransactionCoordinator,
    pub(super) substrate: Arc<dyn ConsensusSubstrate>,
    pub(super) logger: Arc<dyn RoundEventLogger>,
    pub(super) cancellation_token: Option<CancellationToken>,
}

impl RunRoundUseCase {
    pub fn new(settings: ReplicaSettings, ports: &ReplicaPorts) -> Self {
        let facts = CollectFactsUseCase::new(
            ports.oracle.clone(),
            ports.ledger.clone(),
            settings.retry.clone(),
        );
        let coordinator = TransactionCoordinator::new(
            ports.signer.clone(),
            ports.ledger.clone(),
            ports.submissions.clone(),
            ports.journal.clone(),
            settings.payload.clone(),
        )
        .with_retry(settings.retry.clone())
        .with_confirmation_poll(settings.rounds.confirmation_poll);

        Self {
            settings,
            facts,
            coordinator,
            substrate: ports.substrate.clone(),
            logger: ports.logger.clone(),
            cancellation_token: None,
        }
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn settings(&self) -> &ReplicaSettings {
        &self.settings
    }

    /// Drive the round to a terminal state without progress reporting
    pub async fn execute(&self, round: &mut Round) {
        self.execute_with_progress(round, &NoProgress).await
    }

    /// Drive the round to a terminal state.
    ///
    /// Failures are recorded on the round itself; nothing is returned.
    pub async fn execute_with_progress(
        &self,
        round: &mut Round,
        progress: &dyn RoundProgressNotifier,
    ) {
        let replica = self.settings.replica;
        let index = round.index();
        let deadline = Instant::now() + self.settings.rounds.round_timeout;

        info!("{} starting round {}", replica, index);
        progress.on_round_start(replica, index);

        while !round.is_terminal() {
            let phase = round.phase();
            progress.on_phase(replica, index, phase);
            self.logger.log(RoundEvent::new(
                "phase",
                json!({
                    "replica": replica,
                    "round": index,
                    "phase": phase,
                }),
            ));

            if let Err(error) = self.step_with_deadline(round, deadline).await {
                let kind = self.failure_kind(round, &error);
                warn!("{} round {} failed in {}: {} ({})", replica, index, phase, error, kind);
                let failure = RoundFailure::new(kind, phase, error.to_string());
                if let Err(e) = round.fail(failure) {
                    warn!("{} could not mark round {} failed: {}", replica, index, e);
                    break;
                }
            }
        }

        self.log_outcome(round);
        progress.on_round_complete(replica, round);
    }

    /// Run one phase handler, bounded by the round deadline and cancellation.
    async fn step_with_deadline(
        &self,
        round: &mut Round,
        deadline: Instant,
    ) -> Result<(), RoundError> {
        let phase = round.phase();
        let bounded = async {
            match tokio::time::timeout_at(deadline, self.step(round)).await {
                Ok(result) => result,
                Err(_) => Err(RoundError::Deadline { phase }),
            }
        };

        match &self.cancellation_token {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(RoundError::Cancelled),
                    result = bounded => result,
                }
            }
            None => bounded.await,
        }
    }

    /// Dispatch to the handler of the current phase.
    async fn step(&self, round: &mut Round) -> Result<(), RoundError> {
        match round.phase() {
            RoundPhase::CollectFacts => self.collect_facts(round).await,
            RoundPhase::FactsAgreed => Ok(round.advance(RoundPhase::Decide)?),
            RoundPhase::Decide => self.decide(round),
            RoundPhase::BuildTx => self.build_tx(round).await,
            RoundPhase::CollectSignatures => self.collect_signatures(round).await,
            RoundPhase::SignaturesAgreed => Ok(round.advance(RoundPhase::Submit)?),
            RoundPhase::Submit => self.submit(round).await,
            RoundPhase::Confirmed | RoundPhase::Failed => Ok(()),
        }
    }

    /// A replica that refused to sign and then timed out waiting for
    /// signatures reports the mismatch rather than a plain timeout.
    fn failure_kind(&self, round: &Round, error: &RoundError) -> FailureKind {
        if let RoundError::Deadline {
            phase: RoundPhase::CollectSignatures,
        } = error
            && self.refuses_to_sign(round)
        {
            return FailureKind::InvalidPayload;
        }
        error.kind()
    }

    pub(super) fn refuses_to_sign(&self, round: &Round) -> bool {
        match (round.payload(), round.decision()) {
            (Some(payload), Some(decision)) => {
                self.coordinator.verify_payload(payload, decision).is_err()
            }
            _ => false,
        }
    }

    fn log_outcome(&self, round: &Round) {
        let replica = self.settings.replica;
        match (round.outcome(), round.failure()) {
            (Some(outcome), _) => {
                info!("{} round {} confirmed", replica, round.index());
                self.logger.log(RoundEvent::new(
                    "round_confirmed",
                    json!({
                        "replica": replica,
                        "round": round.index(),
                        "decision": round.decision(),
                        "outcome": outcome,
                    }),
                ));
            }
            (None, Some(failure)) => {
                self.logger.log(RoundEvent::new(
                    "round_failed",
                    json!({
                        "replica": replica,
                        "round": round.index(),
                        "kind": failure.kind,
                        "phase": failure.phase,
                        "message": failure.message,
                    }),
                ));
            }
            (None, None) => {}
        }
    }
}
