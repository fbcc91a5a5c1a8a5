//! Rounds under oracle outages, ledger hiccups and missing replicas.

mod common;

use chainbet_application::RetryPolicy;
use chainbet_domain::{Chain, FailureKind, ReplicaId, RoundPhase};
use chainbet_infrastructure::StaticHolderSource;
use common::{STAKE, bettor, fleet, no_progress, settings};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_oracle_outage_fails_round_then_recovers() {
    let mut builder = fleet(settings(2));
    for id in 0..4 {
        builder = builder.with_oracle(
            ReplicaId(id),
            Arc::new(StaticHolderSource::new(1000, 1200).fail_next(1)),
        );
    }
    let fleet = builder.build().unwrap();
    fleet.ledger().place_bet(Chain::Base, STAKE, bettor());

    let reports = fleet.run(CancellationToken::new(), no_progress()).await.unwrap();

    for report in &reports {
        assert_eq!(report.rounds.len(), 2);
        let failure = report.rounds[0].failure().expect("first round should fail");
        assert_eq!(failure.kind, FailureKind::OracleUnavailable);
        assert_eq!(failure.phase, RoundPhase::CollectFacts);

        let settled = report.rounds[1].outcome().and_then(|o| o.receipt()).unwrap();
        // Round 1 owns nonce starting + 1
        assert_eq!(settled.nonce, 11);
    }
    assert_eq!(fleet.ledger().transaction_count(), 1);
}

#[tokio::test]
async fn test_transient_submit_errors_are_retried() {
    let settings = settings(1).with_retry(
        RetryPolicy::default()
            .with_max_attempts(4)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(5)),
    );
    let fleet = fleet(settings).build().unwrap();
    fleet.ledger().place_bet(Chain::Base, STAKE, bettor());
    fleet.ledger().fail_next_submits(2);

    let reports = fleet.run(CancellationToken::new(), no_progress()).await.unwrap();

    assert!(reports.iter().all(|r| r.confirmed() == 1));
    assert_eq!(fleet.ledger().transaction_count(), 1);
    assert!(fleet.ledger().submit_calls() >= 3);
}

#[tokio::test(start_paused = true)]
async fn test_missing_replicas_stall_fact_agreement() {
    let fleet = fleet(settings(1)).build().unwrap();
    fleet.ledger().place_bet(Chain::Base, STAKE, bettor());

    let reports = fleet
        .run_replicas(
            &[ReplicaId(0), ReplicaId(1)],
            CancellationToken::new(),
            no_progress(),
        )
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    for report in &reports {
        let failure = report.rounds[0].failure().unwrap();
        assert_eq!(failure.kind, FailureKind::ConsensusTimeout);
        assert_eq!(failure.phase, RoundPhase::CollectFacts);
    }
    assert_eq!(fleet.ledger().submit_calls(), 0);
}

#[tokio::test]
async fn test_cancelled_fleet_stops_without_rounds() {
    let fleet = fleet(settings(5)).build().unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let reports = fleet.run(token, no_progress()).await.unwrap();

    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|r| r.rounds.is_empty()));
    assert!(fleet.substrate().is_closed().await);
}
