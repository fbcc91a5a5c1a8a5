//! Progress notification port
//!
//! Defines the interface for reporting round progress of one replica.

use chainbet_domain::{ReplicaId, Round, RoundIndex, RoundPhase};

/// Callback for progress updates while a replica drives rounds
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (spinners, plain logs, etc.)
pub trait RoundProgressNotifier: Send + Sync {
    /// Called when a round is opened
    fn on_round_start(&self, replica: ReplicaId, round: RoundIndex);

    /// Called each time the round enters a new phase
    fn on_phase(&self, replica: ReplicaId, round: RoundIndex, phase: RoundPhase);

    /// Called once the round is terminal
    fn on_round_complete(&self, replica: ReplicaId, round: &Round);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl RoundProgressNotifier for NoProgress {
    fn on_round_start(&self, _replica: ReplicaId, _round: RoundIndex) {}
    fn on_phase(&self, _replica: ReplicaId, _round: RoundIndex, _phase: RoundPhase) {}
    fn on_round_complete(&self, _replica: ReplicaId, _round: &Round) {}
}
