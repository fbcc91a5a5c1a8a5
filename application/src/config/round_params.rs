//! Round parameters: round loop control.
//!
//! [`RoundParams`] groups the static parameters that control the round loop in
//! [`ReplicaService`](crate::use_cases::replica_service::ReplicaService) and
//! the per-round deadline in [`RunRoundUseCase`](crate::use_cases::run_round::RunRoundUseCase).
//! These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Round loop control parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundParams {
    /// Deadline for one round, from open to terminal state.
    pub round_timeout: Duration,
    /// Pause between a terminal round and the next one.
    pub round_interval: Duration,
    /// How often to poll the ledger for finality.
    pub confirmation_poll: Duration,
    /// Stop after this many rounds (`None` runs until cancelled).
    pub max_rounds: Option<u64>,
    /// First round index when there is nothing to resume.
    pub start_round: u64,
}

impl Default for RoundParams {
    fn default() -> Self {
        Self {
            round_timeout: Duration::from_secs(120),
            round_interval: Duration::from_secs(30),
            confirmation_poll: Duration::from_secs(2),
            max_rounds: None,
            start_round: 0,
        }
    }
}

impl RoundParams {
    // ==================== Builder Methods ====================

    pub fn with_round_timeout(mut self, timeout: Duration) -> Self {
        self.round_timeout = timeout;
        self
    }

    pub fn with_round_interval(mut self, interval: Duration) -> Self {
        self.round_interval = interval;
        self
    }

    pub fn with_confirmation_poll(mut self, poll: Duration) -> Self {
        self.confirmation_poll = poll;
        self
    }

    pub fn with_max_rounds(mut self, max: u64) -> Self {
        self.max_rounds = Some(max);
        self
    }

    pub fn with_start_round(mut self, start: u64) -> Self {
        self.start_round = start;
        self
    }
}
