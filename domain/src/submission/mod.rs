//! Submission records
//!
//! The submission log is append-only. Each round may have several records
//! (pending before submit, submitted, then confirmed or failed); the latest
//! one per round is authoritative.

use crate::core::hash::TxHash;
use crate::core::ids::RoundIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Written before the ledger call; the call may or may not have landed
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Confirmed => "confirmed",
            SubmissionStatus::Failed => "failed",
        }
    }

    /// The transaction reached the ledger; never submit it again.
    pub fn blocks_resubmission(&self) -> bool {
        matches!(self, SubmissionStatus::Submitted | SubmissionStatus::Confirmed)
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger receipt for a settled round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub round: RoundIndex,
    pub tx_hash: TxHash,
    pub nonce: u64,
    /// Block the transaction was finalized in, once known
    pub final_block: Option<u64>,
}

/// One line of the submission log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub round: RoundIndex,
    pub tx_hash: Option<TxHash>,
    pub status: SubmissionStatus,
    pub recorded_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn new(round: RoundIndex, tx_hash: Option<TxHash>, status: SubmissionStatus) -> Self {
        Self {
            round,
            tx_hash,
            status,
            recorded_at: Utc::now(),
        }
    }

    pub fn pending(round: RoundIndex) -> Self {
        Self::new(round, None, SubmissionStatus::Pending)
    }
}

/// Collapse a log to the latest record per round.
///
/// Later entries win, except that a record which already reached the ledger
/// is never downgraded by a later `Pending` line.
pub fn latest_records(records: &[SubmissionRecord]) -> BTreeMap<RoundIndex, SubmissionRecord> {
    let mut latest: BTreeMap<RoundIndex, SubmissionRecord> = BTreeMap::new();
    for record in records {
        if let Some(existing) = latest.get(&record.round)
            && existing.status.blocks_resubmission()
            && record.status == SubmissionStatus::Pending
        {
            continue;
        }
        latest.insert(record.round, record.clone());
    }
    latest
}
