//! Consensus substrate port
//!
//! The substrate is a black-box agreement service: replicas propose values
//! for a `(round, phase)` slot and every replica receives the same agreed
//! value once a quorum has proposed.

use async_trait::async_trait;
use chainbet_domain::{Agreement, ConsensusPhase, Proposal, ReplicaId, RoundIndex};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstrateError {
    #[error("Substrate closed")]
    Closed,

    #[error("Proposal rejected: {0}")]
    Rejected(String),

    #[error("Substrate unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ConsensusSubstrate: Send + Sync {
    /// Submit this replica's value for the given slot.
    ///
    /// Proposing again for a slot that already has a value from this replica
    /// is a no-op, as is proposing after agreement was reached.
    async fn propose(
        &self,
        replica: ReplicaId,
        round: RoundIndex,
        proposal: Proposal,
    ) -> Result<(), SubstrateError>;

    /// Agreed value for a slot, if one exists yet.
    async fn agreed(
        &self,
        round: RoundIndex,
        phase: ConsensusPhase,
    ) -> Result<Option<Agreement>, SubstrateError>;

    /// Wait until the slot has an agreed value. May block indefinitely; callers
    /// bound it with the round deadline.
    async fn wait_agreed(
        &self,
        round: RoundIndex,
        phase: ConsensusPhase,
    ) -> Result<Agreement, SubstrateError>;
}
