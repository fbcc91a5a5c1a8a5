//! Agreement over replica proposals.
//!
//! Given the proposals a substrate received for one (round, phase), decide
//! the canonical value every replica will act on:
//!
//! | Phase        | Waits for                       | Agreed value                          |
//! |--------------|---------------------------------|---------------------------------------|
//! | `Facts`      | `quorum` proposals              | most common observation (no timestamps) |
//! | `Payload`    | `quorum` proposals              | most common payload by hash           |
//! | `Signatures` | `threshold` shares on one hash  | those shares, sorted by replica id    |
//!
//! Ties are broken by the lowest replica id among each group's supporters.

use crate::chain::Observation;
use crate::core::hash::PayloadHash;
use crate::core::ids::{ReplicaId, RoundIndex};
use crate::payload::{SignatureShare, SignedPayload, TransactionPayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A consensus checkpoint within a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusPhase {
    Facts,
    Payload,
    Signatures,
}

impl ConsensusPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusPhase::Facts => "facts",
            ConsensusPhase::Payload => "payload",
            ConsensusPhase::Signatures => "signatures",
        }
    }
}

impl std::fmt::Display for ConsensusPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A value one replica proposes to the substrate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Proposal {
    Facts(Observation),
    Payload(TransactionPayload),
    Signature(SignatureShare),
}

impl Proposal {
    pub fn phase(&self) -> ConsensusPhase {
        match self {
            Proposal::Facts(_) => ConsensusPhase::Facts,
            Proposal::Payload(_) => ConsensusPhase::Payload,
            Proposal::Signature(_) => ConsensusPhase::Signatures,
        }
    }
}

/// The value the substrate delivers once a phase is agreed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Agreement {
    Facts(Observation),
    Payload(TransactionPayload),
    Signatures(SignedPayload),
}

impl Agreement {
    pub fn phase(&self) -> ConsensusPhase {
        match self {
            Agreement::Facts(_) => ConsensusPhase::Facts,
            Agreement::Payload(_) => ConsensusPhase::Payload,
            Agreement::Signatures(_) => ConsensusPhase::Signatures,
        }
    }

    pub fn into_facts(self) -> Option<Observation> {
        match self {
            Agreement::Facts(observation) => Some(observation),
            _ => None,
        }
    }

    pub fn into_payload(self) -> Option<TransactionPayload> {
        match self {
            Agreement::Payload(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn into_signatures(self) -> Option<SignedPayload> {
        match self {
            Agreement::Signatures(signed) => Some(signed),
            _ => None,
        }
    }
}

/// Sizes the substrate waits for before agreeing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementParams {
    /// Proposals needed before facts or payload can be agreed
    pub quorum: usize,
    /// Matching signature shares needed
    pub signature_threshold: usize,
}

/// Resolve the proposals received so far for `round`/`phase`.
///
/// Proposals of another phase or round are ignored. Returns `None` while the
/// phase is still waiting for more proposals.
pub fn resolve_agreement(
    round: RoundIndex,
    phase: ConsensusPhase,
    proposals: &BTreeMap<ReplicaId, Proposal>,
    params: &AgreementParams,
) -> Option<Agreement> {
    match phase {
        ConsensusPhase::Facts => {
            let facts: Vec<(ReplicaId, &Observation)> = proposals
                .iter()
                .filter_map(|(replica, p)| match p {
                    Proposal::Facts(obs) => Some((*replica, obs)),
                    _ => None,
                })
                .collect();
            if facts.is_empty() || facts.len() < params.quorum {
                return None;
            }
            most_common(facts, |obs| obs.key()).map(|obs| Agreement::Facts(obs.clone()))
        }
        ConsensusPhase::Payload => {
            let payloads: Vec<(ReplicaId, &TransactionPayload)> = proposals
                .iter()
                .filter_map(|(replica, p)| match p {
                    Proposal::Payload(payload) if payload.round == round => {
                        Some((*replica, payload))
                    }
                    _ => None,
                })
                .collect();
            if payloads.is_empty() || payloads.len() < params.quorum {
                return None;
            }
            most_common(payloads, |payload| payload.hash())
                .map(|payload| Agreement::Payload(payload.clone()))
        }
        ConsensusPhase::Signatures => {
            let threshold = params.signature_threshold.max(1);
            let mut by_hash: BTreeMap<PayloadHash, Vec<&SignatureShare>> = BTreeMap::new();
            for (replica, proposal) in proposals {
                if let Proposal::Signature(share) = proposal
                    && share.round == round
                    && share.replica == *replica
                {
                    by_hash.entry(share.payload_hash).or_default().push(share);
                }
            }

            // BTreeMap iteration keeps shares ordered by replica id
            let (payload_hash, shares) = by_hash
                .into_iter()
                .filter(|(_, shares)| shares.len() >= threshold)
                .min_by_key(|(_, shares)| (std::cmp::Reverse(shares.len()), shares[0].replica))?;

            Some(Agreement::Signatures(SignedPayload {
                round,
                payload_hash,
                signatures: shares.into_iter().take(threshold).cloned().collect(),
            }))
        }
    }
}

/// Pick the value whose key has the most supporters; ties go to the group
/// containing the lowest replica id. The returned value is that of the
/// lowest-id supporter.
fn most_common<'a, T, K, F>(entries: Vec<(ReplicaId, &'a T)>, key: F) -> Option<&'a T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut groups: BTreeMap<K, Vec<(ReplicaId, &'a T)>> = BTreeMap::new();
    for (replica, value) in entries {
        groups.entry(key(value)).or_default().push((replica, value));
    }

    groups
        .into_values()
        .filter_map(|mut members| {
            members.sort_by_key(|(replica, _)| *replica);
            members.first().map(|first| (members.len(), *first))
        })
        .min_by_key(|(count, (replica, _))| (std::cmp::Reverse(*count), *replica))
        .map(|(_, (_, value))| value)
}
