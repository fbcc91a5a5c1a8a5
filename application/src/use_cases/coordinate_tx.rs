//! Transaction Coordinator
//!
//! Turns an agreed decision into one settled ledger transaction:
//!
//! 1. `build_payload`: deterministic encoding of the decision
//! 2. `collect_signature`: this replica's share, guarded by the signing journal
//! 3. `submit`: at most one effective submission per round, guarded by the
//!    submission log and the ledger's nonce deduplication
//! 4. `confirm`: poll until the transaction is final or reverted

use crate::config::RetryPolicy;
use crate::ports::journal::{Reservation, SignatureJournal, SubmissionLog};
use crate::ports::ledger::{Confirmation, LedgerGateway, SubmitOutcome};
use crate::ports::signer::Signer;
use crate::use_cases::run_round::RoundError;
use crate::use_cases::shared::{ledger_failure, with_retry};
use chainbet_domain::{
    Decision, PayloadContext, Receipt, RoundIndex, SignatureShare, SignedPayload,
    SubmissionRecord, SubmissionStatus, TransactionPayload, TxHash, build_payload, signing_bytes,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct TransactionCoordinator {
    signer: Arc<dyn Signer>,
    ledger: Arc<dyn LedgerGateway>,
    submissions: Arc<dyn SubmissionLog>,
    journal: Arc<dyn SignatureJournal>,
    context: PayloadContext,
    retry: RetryPolicy,
    confirmation_poll: Duration,
}

impl TransactionCoordinator {
    pub fn new(
        signer: Arc<dyn Signer>,
        ledger: Arc<dyn LedgerGateway>,
        submissions: Arc<dyn SubmissionLog>,
        journal: Arc<dyn SignatureJournal>,
        context: PayloadContext,
    ) -> Self {
        Self {
            signer,
            ledger,
            submissions,
            journal,
            context,
            retry: RetryPolicy::default(),
            confirmation_poll: Duration::from_secs(2),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_confirmation_poll(mut self, poll: Duration) -> Self {
        self.confirmation_poll = poll;
        self
    }

    /// Payload for a decision; `None` when there is nothing to settle.
    pub fn build_payload(&self, decision: &Decision, round: RoundIndex) -> Option<TransactionPayload> {
        build_payload(decision, round, &self.context)
    }

    /// Recompute the payload locally and compare it with the proposed one.
    pub fn verify_payload(
        &self,
        proposed: &TransactionPayload,
        decision: &Decision,
    ) -> Result<(), RoundError> {
        let expected = self.build_payload(decision, proposed.round).ok_or_else(|| {
            RoundError::InvalidPayload("decision has nothing to settle".to_string())
        })?;
        let (expected_hash, proposed_hash) = (expected.hash(), proposed.hash());
        if expected_hash != proposed_hash {
            return Err(RoundError::InvalidPayload(format!(
                "proposed payload {} does not match local payload {}",
                proposed_hash.short(),
                expected_hash.short()
            )));
        }
        Ok(())
    }

    /// Sign a payload for its round.
    ///
    /// The journal is written before signing. A second, different payload for
    /// the same round is refused; the same payload yields the same share.
    pub async fn collect_signature(
        &self,
        payload: &TransactionPayload,
    ) -> Result<SignatureShare, RoundError> {
        let round = payload.round;
        let payload_hash = payload.hash();

        match self.journal.reserve(round, payload_hash)? {
            Reservation::Fresh => {}
            Reservation::Repeat => info!("Round {}: re-signing payload {}", round, payload_hash.short()),
            Reservation::Conflict { signed } => {
                warn!(
                    "Round {}: refusing to sign {}; {} already signed",
                    round,
                    payload_hash.short(),
                    signed.short()
                );
                return Err(RoundError::DoubleSign { round, signed });
            }
        }

        let signature = self
            .signer
            .sign(&signing_bytes(round, &payload_hash))
            .await?;

        Ok(SignatureShare {
            replica: self.signer.replica(),
            round,
            payload_hash,
            signature,
        })
    }

    /// Submit a signed payload at most once per round.
    ///
    /// Returns the transaction hash, or `None` when the ledger reports the
    /// slot already resolved without naming the transaction.
    pub async fn submit(
        &self,
        payload: &TransactionPayload,
        signed: &SignedPayload,
    ) -> Result<Option<TxHash>, RoundError> {
        let round = payload.round;
        if !signed.covers(payload) {
            return Err(RoundError::InvalidPayload(format!(
                "signatures for {} do not cover payload {}",
                signed.payload_hash.short(),
                payload.hash().short()
            )));
        }

        if let Some(record) = self.submissions.latest(round)?
            && record.status.blocks_resubmission()
        {
            info!(
                "Round {}: already {} ({}), not resubmitting",
                round,
                record.status,
                record
                    .tx_hash
                    .map(|h| h.short())
                    .unwrap_or_else(|| "unknown tx".to_string())
            );
            return Ok(record.tx_hash);
        }

        self.submissions.append(&SubmissionRecord::pending(round))?;

        let outcome = match with_retry(&self.retry, "submit", || self.ledger.submit(payload, signed)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let error = ledger_failure(e);
                if let RoundError::PermanentLedger(reason) = &error
                    && let Err(journal) = self.submissions.append(&SubmissionRecord::new(
                        round,
                        None,
                        SubmissionStatus::Failed,
                    ))
                {
                    warn!(
                        "Round {}: could not record rejected submission ({}): {}",
                        round, reason, journal
                    );
                    return Err(journal.into());
                }
                return Err(error);
            }
        };

        match &outcome {
            SubmitOutcome::Accepted { tx_hash } => {
                info!("Round {}: submitted {} (nonce {})", round, tx_hash.short(), payload.nonce)
            }
            SubmitOutcome::AlreadyResolved { .. } => {
                info!("Round {}: nonce {} already resolved on ledger", round, payload.nonce)
            }
        }

        let tx_hash = outcome.tx_hash();
        self.submissions.append(&SubmissionRecord::new(
            round,
            tx_hash,
            SubmissionStatus::Submitted,
        ))?;
        Ok(tx_hash)
    }

    /// Wait for finality of a submitted transaction.
    ///
    /// Polls until final or reverted; callers bound it with the round deadline.
    pub async fn confirm(
        &self,
        round: RoundIndex,
        tx_hash: TxHash,
        nonce: u64,
    ) -> Result<Receipt, RoundError> {
        loop {
            let status = with_retry(&self.retry, "confirmation", || {
                self.ledger.confirmation(&tx_hash)
            })
            .await
            .map_err(ledger_failure)?;

            match status {
                Confirmation::Final { block } => {
                    self.submissions.append(&SubmissionRecord::new(
                        round,
                        Some(tx_hash),
                        SubmissionStatus::Confirmed,
                    ))?;
                    info!("Round {}: {} final in block {}", round, tx_hash.short(), block);
                    return Ok(Receipt {
                        round,
                        tx_hash,
                        nonce,
                        final_block: Some(block),
                    });
                }
                Confirmation::Reverted { reason } => {
                    self.submissions.append(&SubmissionRecord::new(
                        round,
                        Some(tx_hash),
                        SubmissionStatus::Failed,
                    ))?;
                    return Err(RoundError::PermanentLedger(format!(
                        "transaction {} reverted: {}",
                        tx_hash.short(),
                        reason
                    )));
                }
                Confirmation::Pending => tokio::time::sleep(self.confirmation_poll).await,
            }
        }
    }
}
