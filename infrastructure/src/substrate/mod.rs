//! In-process consensus substrate.
//!
//! [`LocalQuorumSubstrate`] is shared by every replica of a local fleet. It
//! collects one proposal per replica per slot and, once
//! [`resolve_agreement`] accepts the collected set, freezes the slot. Every
//! waiter then observes the same agreed value, which is the property the
//! round state machine relies on. It does not tolerate its own failure; a
//! networked substrate would implement the same port.
//!
//! Only the most recent `retention` rounds are kept. Slots of older rounds
//! are dropped as soon as a newer round is proposed for, and proposals for
//! them are rejected.

use async_trait::async_trait;
use chainbet_application::{ConsensusSubstrate, SubstrateError};
use chainbet_domain::{
    Agreement, AgreementParams, ConsensusPhase, Proposal, ReplicaId, RoundIndex, resolve_agreement,
};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::{Mutex, Notify};
use tracing::debug;

type Slot = (RoundIndex, ConsensusPhase);

/// Rounds of slots kept by default
pub const DEFAULT_RETENTION: u64 = 64;

#[derive(Default)]
struct Slots {
    proposals: BTreeMap<Slot, BTreeMap<ReplicaId, Proposal>>,
    agreed: BTreeMap<Slot, Agreement>,
    /// Rounds below this were pruned
    floor: RoundIndex,
    closed: bool,
}

impl Slots {
    /// Advance the floor so that at most `retention` rounds up to `newest` remain
    fn prune(&mut self, newest: RoundIndex, retention: u64) {
        let floor = RoundIndex(newest.0.saturating_sub(retention.saturating_sub(1)));
        if floor <= self.floor {
            return;
        }
        self.floor = floor;
        self.proposals.retain(|(r, _), _| *r >= floor);
        self.agreed.retain(|(r, _), _| *r >= floor);
    }

    fn is_pruned(&self, round: RoundIndex) -> bool {
        round < self.floor
    }
}

pub struct LocalQuorumSubstrate {
    participants: BTreeSet<ReplicaId>,
    params: AgreementParams,
    retention: u64,
    slots: Mutex<Slots>,
    notify: Notify,
}

impl LocalQuorumSubstrate {
    pub fn new(participants: impl IntoIterator<Item = ReplicaId>, params: AgreementParams) -> Self {
        Self {
            participants: participants.into_iter().collect(),
            params,
            retention: DEFAULT_RETENTION,
            slots: Mutex::new(Slots::default()),
            notify: Notify::new(),
        }
    }

    /// Keep slots of the latest `rounds` rounds only (at least one)
    pub fn with_retention(mut self, rounds: u64) -> Self {
        self.retention = rounds.max(1);
        self
    }

    pub fn params(&self) -> AgreementParams {
        self.params
    }

    /// Wake every waiter with [`SubstrateError::Closed`] and refuse new proposals
    pub async fn close(&self) {
        self.slots.lock().await.closed = true;
        self.notify.notify_waiters();
    }

    /// Number of replicas that proposed for a slot
    pub async fn proposal_count(&self, round: RoundIndex, phase: ConsensusPhase) -> usize {
        self.slots
            .lock()
            .await
            .proposals
            .get(&(round, phase))
            .map_or(0, |p| p.len())
    }

    pub async fn is_closed(&self) -> bool {
        self.slots.lock().await.closed
    }

    /// Slots currently held, agreed or still collecting
    pub async fn slot_count(&self) -> usize {
        let slots = self.slots.lock().await;
        slots
            .proposals
            .keys()
            .chain(slots.agreed.keys())
            .collect::<BTreeSet<_>>()
            .len()
    }

    fn pruned(round: RoundIndex, floor: RoundIndex) -> SubstrateError {
        SubstrateError::Rejected(format!("round {} was pruned (oldest kept {})", round, floor))
    }

    fn check_proposer(&self, replica: ReplicaId, proposal: &Proposal) -> Result<(), SubstrateError> {
        if !self.participants.contains(&replica) {
            return Err(SubstrateError::Rejected(format!(
                "{} is not a participant",
                replica
            )));
        }
        if let Proposal::Signature(share) = proposal
            && share.replica != replica
        {
            return Err(SubstrateError::Rejected(format!(
                "{} proposed a signature share of {}",
                replica, share.replica
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ConsensusSubstrate for LocalQuorumSubstrate {
    async fn propose(
        &self,
        replica: ReplicaId,
        round: RoundIndex,
        proposal: Proposal,
    ) -> Result<(), SubstrateError> {
        self.check_proposer(replica, &proposal)?;
        let phase = proposal.phase();

        let agreed = {
            let mut guard = self.slots.lock().await;
            let slots = &mut *guard;
            if slots.closed {
                return Err(SubstrateError::Closed);
            }
            if slots.is_pruned(round) {
                return Err(Self::pruned(round, slots.floor));
            }
            slots.prune(round, self.retention);
            if slots.agreed.contains_key(&(round, phase)) {
                return Ok(());
            }

            // First proposal per replica per slot is final
            let proposals = slots.proposals.entry((round, phase)).or_default();
            proposals.entry(replica).or_insert(proposal);

            match resolve_agreement(round, phase, proposals, &self.params) {
                Some(agreement) => {
                    debug!(
                        "round {} {}: agreed after {} proposals",
                        round,
                        phase,
                        proposals.len()
                    );
                    slots.agreed.insert((round, phase), agreement);
                    true
                }
                None => false,
            }
        };

        if agreed {
            self.notify.notify_waiters();
        }
        Ok(())
    }

    async fn agreed(
        &self,
        round: RoundIndex,
        phase: ConsensusPhase,
    ) -> Result<Option<Agreement>, SubstrateError> {
        Ok(self.slots.lock().await.agreed.get(&(round, phase)).cloned())
    }

    async fn wait_agreed(
        &self,
        round: RoundIndex,
        phase: ConsensusPhase,
    ) -> Result<Agreement, SubstrateError> {
        loop {
            let notified = self.notify.notified();
            {
                let slots = self.slots.lock().await;
                if let Some(agreement) = slots.agreed.get(&(round, phase)) {
                    return Ok(agreement.clone());
                }
                if slots.closed {
                    return Err(SubstrateError::Closed);
                }
                if slots.is_pruned(round) {
                    return Err(Self::pruned(round, slots.floor));
                }
            }
            notified.await;
        }
    }
}
