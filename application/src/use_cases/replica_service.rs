//! Replica service
//!
//! Runs rounds back to back for one replica: resume from the persisted logs,
//! open a round, drive it to a terminal state, archive it, pause, repeat.
//! Stops on cancellation, after `max_rounds`, or when a round fails in a way
//! that needs the operator.

use crate::config::{ReplicaSettings, RoundParams};
use crate::ports::journal::{JournalError, SignatureJournal, SubmissionLog};
use crate::ports::progress::{NoProgress, RoundProgressNotifier};
use crate::use_cases::run_round::{ReplicaPorts, RunRoundUseCase};
use crate::use_cases::shared::check_cancelled;
use chainbet_domain::{
    DomainError, FailureKind, ReplicaId, Round, RoundFailure, RoundIndex, RoundTable,
    SubmissionStatus, latest_records,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum ReplicaServiceError {
    #[error("Could not read persisted state: {0}")]
    Journal(#[from] JournalError),

    #[error("Round table error: {0}")]
    Domain(#[from] DomainError),
}

/// What one replica did during a run
#[derive(Debug, Clone, Serialize)]
pub struct ReplicaReport {
    pub replica: ReplicaId,
    /// Terminal rounds in execution order
    pub rounds: Vec<Round>,
    /// Failure that stopped the loop and needs the operator
    pub halted: Option<RoundFailure>,
}

impl ReplicaReport {
    pub fn confirmed(&self) -> usize {
        self.rounds.iter().filter(|r| r.outcome().is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.rounds.iter().filter(|r| r.failure().is_some()).count()
    }
}

pub struct ReplicaService {
    run_round: RunRoundUseCase,
    submissions: Arc<dyn SubmissionLog>,
    journal: Arc<dyn SignatureJournal>,
    cancellation_token: Option<CancellationToken>,
}

impl ReplicaService {
    pub fn new(settings: ReplicaSettings, ports: ReplicaPorts) -> Self {
        Self {
            run_round: RunRoundUseCase::new(settings, &ports),
            submissions: ports.submissions,
            journal: ports.journal,
            cancellation_token: None,
        }
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.run_round = self.run_round.with_cancellation(token.clone());
        self.cancellation_token = Some(token);
        self
    }

    pub fn replica(&self) -> ReplicaId {
        self.run_round.settings().replica
    }

    fn params(&self) -> &RoundParams {
        &self.run_round.settings().rounds
    }

    /// Round to start from after a restart.
    ///
    /// A round with a non-terminal submission record, or one this replica
    /// signed for without ever submitting, is resumed so that it settles at
    /// most once. Otherwise the loop continues after the last round touched.
    pub fn resume_index(&self) -> Result<RoundIndex, JournalError> {
        let start = RoundIndex(self.params().start_round);
        let records = latest_records(&self.submissions.records()?);
        let last_signed = self.journal.last_signed_round()?;

        let unfinished = records
            .iter()
            .filter(|(_, record)| {
                !matches!(
                    record.status,
                    SubmissionStatus::Confirmed | SubmissionStatus::Failed
                )
            })
            .map(|(round, _)| *round)
            .min();
        if let Some(round) = unfinished {
            return Ok(round.max(start));
        }

        if let Some(signed) = last_signed
            && !records.contains_key(&signed)
        {
            return Ok(signed.max(start));
        }

        let last_touched = records.keys().next_back().copied().max(last_signed);
        Ok(match last_touched {
            Some(last) => last.next().max(start),
            None => start,
        })
    }

    pub async fn run(&self) -> Result<ReplicaReport, ReplicaServiceError> {
        self.run_with_progress(&NoProgress).await
    }

    pub async fn run_with_progress(
        &self,
        progress: &dyn RoundProgressNotifier,
    ) -> Result<ReplicaReport, ReplicaServiceError> {
        let replica = self.replica();
        let mut table = RoundTable::default();
        let mut index = self.resume_index()?;
        let mut report = ReplicaReport {
            replica,
            rounds: Vec::new(),
            halted: None,
        };

        info!("{} starting at round {}", replica, index);

        loop {
            if self.reached_limit(&report) {
                break;
            }
            if check_cancelled(&self.cancellation_token).is_err() {
                info!("{} cancelled before round {}", replica, index);
                break;
            }

            let round = table.open(index)?;
            self.run_round.execute_with_progress(round, progress).await;
            let round = table.archive(index)?.clone();

            let stop = match round.failure() {
                Some(failure) if failure.kind.needs_operator() => {
                    error!(
                        "{} halting after round {}: {} needs operator attention",
                        replica, index, failure
                    );
                    report.halted = Some(failure.clone());
                    true
                }
                Some(failure) => failure.kind == FailureKind::Cancelled,
                None => false,
            };
            report.rounds.push(round);
            if stop || self.reached_limit(&report) {
                break;
            }

            index = table.next_index(index);
            if !self.pause().await {
                break;
            }
        }

        info!(
            "{} finished: {} confirmed, {} failed",
            replica,
            report.confirmed(),
            report.failed()
        );
        Ok(report)
    }

    fn reached_limit(&self, report: &ReplicaReport) -> bool {
        self.params()
            .max_rounds
            .is_some_and(|max| report.rounds.len() as u64 >= max)
    }

    /// Sleep between rounds. Returns `false` if cancelled meanwhile.
    async fn pause(&self) -> bool {
        let interval = self.params().round_interval;
        match &self.cancellation_token {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => false,
                    _ = tokio::time::sleep(interval) => true,
                }
            }
            None => {
                tokio::time::sleep(interval).await;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::ports::ledger::LedgerError;
    use crate::use_cases::test_support::{
        FixedOracle, MemoryJournal, MemorySubmissionLog, MockLedger, MockSigner, TestSubstrate,
        context,
    };
    use chainbet_domain::{AgreementParams, Digest, SubmissionRecord};
    use std::time::Duration;

    struct Fixture {
        service: ReplicaService,
        submissions: Arc<MemorySubmissionLog>,
        journal: Arc<MemoryJournal>,
    }

    fn fixture(ledger: MockLedger, rounds: RoundParams) -> Fixture {
        let submissions = Arc::new(MemorySubmissionLog::default());
        let journal = Arc::new(MemoryJournal::default());
        let params = AgreementParams {
            quorum: 1,
            signature_threshold: 1,
        };
        let ports = ReplicaPorts::new(
            Arc::new(FixedOracle {
                arbitrum: 1000,
                base: 1200,
            }),
            Arc::new(ledger),
            Arc::new(TestSubstrate::new(params)),
            Arc::new(MockSigner::new(ReplicaId(0))),
            submissions.clone(),
            journal.clone(),
        );
        let settings = ReplicaSettings::new(ReplicaId(0), context(1), params)
            .with_rounds(rounds)
            .with_retry(RetryPolicy::once());
        Fixture {
            service: ReplicaService::new(settings, ports),
            submissions,
            journal,
        }
    }

    fn quick(max_rounds: u64) -> RoundParams {
        RoundParams::default()
            .with_round_interval(Duration::from_millis(1))
            .with_round_timeout(Duration::from_secs(5))
            .with_max_rounds(max_rounds)
    }

    #[tokio::test]
    async fn test_runs_requested_rounds() {
        let f = fixture(MockLedger::new(), quick(3));
        let report = f.service.run().await.unwrap();

        let indices: Vec<u64> = report.rounds.iter().map(|r| r.index().value()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(report.confirmed(), 3);
        assert!(report.halted.is_none());
    }

    #[test]
    fn test_resume_after_clean_shutdown() {
        let f = fixture(MockLedger::new(), quick(1));
        let tx = Digest::of(&[b"tx"]);
        f.submissions
            .append(&SubmissionRecord::new(RoundIndex(4), Some(tx), SubmissionStatus::Confirmed))
            .unwrap();
        assert_eq!(f.service.resume_index().unwrap(), RoundIndex(5));
    }

    #[test]
    fn test_resume_unfinished_submission() {
        let f = fixture(MockLedger::new(), quick(1));
        f.submissions
            .append(&SubmissionRecord::pending(RoundIndex(6)))
            .unwrap();
        assert_eq!(f.service.resume_index().unwrap(), RoundIndex(6));
    }

    #[test]
    fn test_resume_signed_but_never_submitted() {
        let f = fixture(MockLedger::new(), quick(1));
        f.journal
            .reserve(RoundIndex(2), Digest::of(&[b"payload"]))
            .unwrap();
        assert_eq!(f.service.resume_index().unwrap(), RoundIndex(2));
    }

    #[tokio::test]
    async fn test_permanent_ledger_error_halts() {
        let ledger = MockLedger::new()
            .with_bet(chainbet_domain::Bet {
                id: 1,
                choice: chainbet_domain::Chain::Base,
                stake: 10_000,
                bettor: crate::use_cases::test_support::bettor(),
            })
            .with_pool(50_000)
            .failing_submit(LedgerError::Permanent("execution reverted".to_string()));
        let f = fixture(ledger, quick(5));

        let report = f.service.run().await.unwrap();

        assert_eq!(report.rounds.len(), 1);
        let halted = report.halted.unwrap();
        assert_eq!(halted.kind, FailureKind::PermanentLedger);
    }

    #[tokio::test]
    async fn test_cancelled_service_stops() {
        let token = CancellationToken::new();
        token.cancel();
        let f = fixture(MockLedger::new(), RoundParams::default());
        let service = f.service.with_cancellation(token);

        let report = service.run().await.unwrap();
        assert!(report.rounds.is_empty());
    }
}
