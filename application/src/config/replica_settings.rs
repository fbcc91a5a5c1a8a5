//! Replica settings container.
//!
//! [`ReplicaSettings`] groups everything one replica needs to drive rounds:
//! its identity, the shared payload context and agreement parameters, the
//! prize policy and the loop/retry parameters.
//!
//! Every field except `replica` must be identical across the fleet, otherwise
//! honest replicas build different payloads and the round cannot agree.

use super::{RetryPolicy, RoundParams};
use chainbet_domain::{AgreementParams, PayloadContext, PrizePolicy, ReplicaId};

#[derive(Debug, Clone)]
pub struct ReplicaSettings {
    pub replica: ReplicaId,
    pub payload: PayloadContext,
    pub agreement: AgreementParams,
    pub prize: PrizePolicy,
    pub rounds: RoundParams,
    pub retry: RetryPolicy,
}

impl ReplicaSettings {
    pub fn new(replica: ReplicaId, payload: PayloadContext, agreement: AgreementParams) -> Self {
        Self {
            replica,
            payload,
            agreement,
            prize: PrizePolicy::default(),
            rounds: RoundParams::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_prize(mut self, prize: PrizePolicy) -> Self {
        self.prize = prize;
        self
    }

    pub fn with_rounds(mut self, rounds: RoundParams) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Same settings for another replica of the fleet
    pub fn for_replica(&self, replica: ReplicaId) -> Self {
        Self {
            replica,
            ..self.clone()
        }
    }
}
