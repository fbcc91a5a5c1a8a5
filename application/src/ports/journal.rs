//! Persistence ports: the submission log and the signing journal.
//!
//! Both are written before the side effect they guard, so a replica that
//! crashes mid-step finds evidence of the step on restart.

use chainbet_domain::{PayloadHash, RoundIndex, SubmissionRecord, latest_records};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    #[error("Journal I/O error: {0}")]
    Io(String),

    #[error("Corrupt journal entry at line {line}: {message}")]
    Corrupt { line: usize, message: String },
}

impl From<std::io::Error> for JournalError {
    fn from(e: std::io::Error) -> Self {
        JournalError::Io(e.to_string())
    }
}

/// Append-only log of submission attempts, keyed by round index
pub trait SubmissionLog: Send + Sync {
    fn append(&self, record: &SubmissionRecord) -> Result<(), JournalError>;

    /// Every record in append order
    fn records(&self) -> Result<Vec<SubmissionRecord>, JournalError>;

    /// Authoritative record for a round
    fn latest(&self, round: RoundIndex) -> Result<Option<SubmissionRecord>, JournalError> {
        let records = self.records()?;
        Ok(latest_records(&records).remove(&round))
    }
}

/// Outcome of asking the journal for permission to sign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// First signature for this round; recorded
    Fresh,
    /// Same payload hash was already recorded for this round
    Repeat,
    /// A different payload was already signed for this round
    Conflict { signed: PayloadHash },
}

/// Record of which payload hash this replica signed per round
pub trait SignatureJournal: Send + Sync {
    /// Atomically check and record `(round, payload_hash)`.
    fn reserve(&self, round: RoundIndex, payload_hash: PayloadHash)
    -> Result<Reservation, JournalError>;

    /// Highest round this replica has signed for
    fn last_signed_round(&self) -> Result<Option<RoundIndex>, JournalError>;
}
