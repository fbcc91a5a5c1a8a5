//! Full rounds across a four-replica fleet.

mod common;

use chainbet_application::{ConsensusSubstrate, SubmissionLog};
use chainbet_domain::{Chain, ConsensusPhase, RoundIndex, RoundOutcome, RoundPhase, SubmissionStatus, Verdict};
use chainbet_infrastructure::JsonlSubmissionLog;
use common::{POOL, STAKE, bettor, fleet, no_progress, settings};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_four_replicas_settle_one_bet() {
    let fleet = fleet(settings(1)).build().unwrap();
    let bet_id = fleet.ledger().place_bet(Chain::Base, STAKE, bettor());

    let reports = fleet.run(CancellationToken::new(), no_progress()).await.unwrap();

    assert_eq!(reports.len(), 4);
    for report in &reports {
        assert_eq!(report.rounds.len(), 1);
        let round = &report.rounds[0];
        assert_eq!(round.phase(), RoundPhase::Confirmed, "{:?}", round.failure());

        let decision = round.decision().unwrap();
        assert_eq!(decision.winning_chain, Some(Chain::Base));
        assert_eq!(decision.holder_difference, 200);
        assert_eq!(decision.verdict, Verdict::Won);
        assert_eq!(decision.prize_amount, 2_000);
        assert_eq!(round.signed().unwrap().len(), 3);

        match round.outcome() {
            Some(RoundOutcome::Settled { receipt }) => assert_eq!(receipt.nonce, 10),
            other => panic!("expected a settlement, got {:?}", other),
        }
    }

    // Every replica settled the same transaction
    let hashes: Vec<_> = reports
        .iter()
        .filter_map(|r| r.rounds[0].outcome().and_then(|o| o.receipt()).map(|rc| rc.tx_hash))
        .collect();
    assert_eq!(hashes.len(), 4);
    assert!(hashes.windows(2).all(|w| w[0] == w[1]));

    let ledger = fleet.ledger();
    assert_eq!(ledger.transaction_count(), 1);
    assert_eq!(ledger.balance_of(&bettor()), 2_000);
    assert_eq!(ledger.pool(), POOL - 2_000);
    assert_eq!(ledger.bet_result(bet_id), Some(Verdict::Won.resolution_code()));
    let decision = reports[0].rounds[0].decision().unwrap();
    assert_eq!(ledger.bet_details(bet_id), Some(decision.details_digest()));
}

#[tokio::test]
async fn test_losing_bet_resolves_without_payout() {
    let fleet = fleet(settings(1)).build().unwrap();
    let bet_id = fleet.ledger().place_bet(Chain::Arbitrum, STAKE, bettor());

    let reports = fleet.run(CancellationToken::new(), no_progress()).await.unwrap();

    assert!(reports.iter().all(|r| r.confirmed() == 1));
    assert_eq!(fleet.ledger().transaction_count(), 1);
    assert_eq!(fleet.ledger().balance_of(&bettor()), 0);
    assert_eq!(
        fleet.ledger().bet_result(bet_id),
        Some(Verdict::Lost.resolution_code())
    );
}

#[tokio::test]
async fn test_second_round_without_bet_takes_no_action() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = fleet(settings(2))
        .with_journal_dir(dir.path())
        .build()
        .unwrap();
    fleet.ledger().place_bet(Chain::Base, STAKE, bettor());

    let reports = fleet.run(CancellationToken::new(), no_progress()).await.unwrap();

    for report in &reports {
        assert_eq!(report.confirmed(), 2);
        assert!(matches!(
            report.rounds[1].outcome(),
            Some(RoundOutcome::NoAction { .. })
        ));
    }
    assert_eq!(fleet.ledger().transaction_count(), 1);

    // Persisted state survives the run
    let replica_dir = dir.path().join("replica-0");
    let log = JsonlSubmissionLog::open(replica_dir.join("submissions.jsonl")).unwrap();
    let latest = log.latest(RoundIndex(0)).unwrap().unwrap();
    assert_eq!(latest.status, SubmissionStatus::Confirmed);
    assert!(log.latest(RoundIndex(1)).unwrap().is_none());

    let events = std::fs::read_to_string(replica_dir.join("rounds.jsonl")).unwrap();
    let confirmed = events
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .filter(|event| event["type"] == "round_confirmed")
        .count();
    assert_eq!(confirmed, 2);
}

#[tokio::test]
async fn test_long_run_keeps_substrate_bounded() {
    let fleet = fleet(settings(12))
        .with_substrate_retention(4)
        .build()
        .unwrap();
    fleet.ledger().place_bet(Chain::Base, STAKE, bettor());

    let reports = fleet.run(CancellationToken::new(), no_progress()).await.unwrap();

    for report in &reports {
        assert_eq!(report.confirmed(), 12, "{:?}", report.halted);
    }
    let substrate = fleet.substrate();
    // Four rounds of at most three phases each
    assert!(substrate.slot_count().await <= 4 * 3);
    for phase in [ConsensusPhase::Facts, ConsensusPhase::Payload, ConsensusPhase::Signatures] {
        assert!(substrate.agreed(RoundIndex(0), phase).await.unwrap().is_none());
    }
    assert!(
        substrate
            .agreed(RoundIndex(11), ConsensusPhase::Facts)
            .await
            .unwrap()
            .is_some()
    );
    assert!(!substrate.is_closed().await);
}
