//! Persistent replica state
//!
//! Two append-only logs survive restarts:
//!
//! - the submission log: one record per status change of a round's transaction
//! - the signature journal: one entry per round this replica signed for
//!
//! Both exist in memory (tests, throwaway fleets) and as JSONL files.

mod append_log;
mod jsonl;
mod memory;

pub use jsonl::{JsonlSignatureJournal, JsonlSubmissionLog};
pub use memory::{InMemorySignatureJournal, InMemorySubmissionLog};

use chainbet_application::Reservation;
use chainbet_domain::{PayloadHash, RoundIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One line of the signature journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEntry {
    pub round: RoundIndex,
    pub payload_hash: PayloadHash,
    pub signed_at: chrono::DateTime<chrono::Utc>,
}

/// Reservation against what was already signed
fn check_reservation(
    signed: &BTreeMap<RoundIndex, PayloadHash>,
    round: RoundIndex,
    payload_hash: PayloadHash,
) -> Option<Reservation> {
    signed.get(&round).map(|existing| {
        if *existing == payload_hash {
            Reservation::Repeat
        } else {
            Reservation::Conflict { signed: *existing }
        }
    })
}
