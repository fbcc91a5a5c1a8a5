//! A replica that loses track of its submission and comes back.

mod common;

use chainbet_application::SubmissionLog;
use chainbet_domain::{Chain, FailureKind, RoundIndex, RoundPhase, SubmissionStatus};
use chainbet_infrastructure::JsonlSubmissionLog;
use common::{STAKE, bettor, fleet, no_progress, settings};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_restarted_replica_settles_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = fleet(settings(1))
        .with_journal_dir(dir.path())
        .build()
        .unwrap();
    fleet.ledger().place_bet(Chain::Base, STAKE, bettor());
    // The first submitter executes the transaction but never hears back
    fleet.ledger().lose_next_receipts(1);

    let reports = fleet.run(CancellationToken::new(), no_progress()).await.unwrap();

    let crashed: Vec<_> = reports
        .iter()
        .filter(|r| r.rounds[0].failure().is_some())
        .collect();
    assert_eq!(crashed.len(), 1);
    let crashed = crashed[0].replica;
    let failure = reports[crashed.0 as usize].rounds[0].failure().unwrap();
    assert_eq!(failure.kind, FailureKind::TransientNetwork);
    assert_eq!(failure.phase, RoundPhase::Submit);
    assert_eq!(fleet.ledger().transaction_count(), 1);

    // Its log on disk still says the submission is in flight
    let log_path = dir
        .path()
        .join(format!("replica-{}", crashed.0))
        .join("submissions.jsonl");
    let on_disk = JsonlSubmissionLog::open(&log_path).unwrap();
    assert_eq!(
        on_disk.latest(RoundIndex(0)).unwrap().unwrap().status,
        SubmissionStatus::Pending
    );

    let service = fleet.service(crashed).unwrap();
    assert_eq!(service.resume_index().unwrap(), RoundIndex(0));

    let rerun = fleet
        .run_replicas(&[crashed], CancellationToken::new(), no_progress())
        .await
        .unwrap();

    let round = &rerun[0].rounds[0];
    assert_eq!(round.index(), RoundIndex(0));
    assert_eq!(round.phase(), RoundPhase::Confirmed, "{:?}", round.failure());
    assert_eq!(fleet.ledger().transaction_count(), 1);
    assert_eq!(fleet.ledger().balance_of(&bettor()), 2_000);
}

#[tokio::test]
async fn test_finished_replica_moves_past_settled_round() {
    let dir = tempfile::tempdir().unwrap();
    let fleet = fleet(settings(1))
        .with_journal_dir(dir.path())
        .build()
        .unwrap();
    fleet.ledger().place_bet(Chain::Base, STAKE, bettor());

    let reports = fleet.run(CancellationToken::new(), no_progress()).await.unwrap();
    assert!(reports.iter().all(|r| r.confirmed() == 1));

    for id in fleet.replica_ids() {
        let service = fleet.service(id).unwrap();
        assert_eq!(service.resume_index().unwrap(), RoundIndex(1));
    }
}
