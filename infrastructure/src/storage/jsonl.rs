//! JSONL-backed stores.
//!
//! Both stores replay their file on open and keep the replayed state in
//! memory. Writes hit the file (and are synced) before the in-memory state
//! changes, so a crash can never leave the process believing something the
//! file does not record.

use super::append_log::AppendLog;
use super::{SignedEntry, check_reservation};
use chainbet_application::{JournalError, Reservation, SignatureJournal, SubmissionLog};
use chainbet_domain::{PayloadHash, RoundIndex, SubmissionRecord};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

fn poisoned() -> JournalError {
    JournalError::Io("journal lock poisoned".to_string())
}

struct LogState {
    file: AppendLog,
    records: Vec<SubmissionRecord>,
}

/// Submission log stored as one [`SubmissionRecord`] per line
pub struct JsonlSubmissionLog {
    state: Mutex<LogState>,
}

impl JsonlSubmissionLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let (file, records) = AppendLog::open::<SubmissionRecord>(path.as_ref())?;
        debug!(
            "Replayed {} submission records from {}",
            records.len(),
            file.path().display()
        );
        Ok(Self {
            state: Mutex::new(LogState { file, records }),
        })
    }
}

impl SubmissionLog for JsonlSubmissionLog {
    fn append(&self, record: &SubmissionRecord) -> Result<(), JournalError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        state.file.append(record)?;
        state.records.push(record.clone());
        Ok(())
    }

    fn records(&self) -> Result<Vec<SubmissionRecord>, JournalError> {
        Ok(self.state.lock().map_err(|_| poisoned())?.records.clone())
    }
}

struct JournalState {
    file: AppendLog,
    signed: BTreeMap<RoundIndex, PayloadHash>,
}

/// Signature journal stored as one [`SignedEntry`] per line.
///
/// The entry is written before the signature is produced.
pub struct JsonlSignatureJournal {
    state: Mutex<JournalState>,
}

impl JsonlSignatureJournal {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let (file, entries) = AppendLog::open::<SignedEntry>(path.as_ref())?;
        let mut signed = BTreeMap::new();
        for entry in entries {
            // First entry per round wins; later ones cannot exist unless the
            // file was edited by hand.
            signed.entry(entry.round).or_insert(entry.payload_hash);
        }
        Ok(Self {
            state: Mutex::new(JournalState { file, signed }),
        })
    }
}

impl SignatureJournal for JsonlSignatureJournal {
    fn reserve(
        &self,
        round: RoundIndex,
        payload_hash: PayloadHash,
    ) -> Result<Reservation, JournalError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if let Some(reservation) = check_reservation(&state.signed, round, payload_hash) {
            return Ok(reservation);
        }

        state.file.append(&SignedEntry {
            round,
            payload_hash,
            signed_at: chrono::Utc::now(),
        })?;
        state.signed.insert(round, payload_hash);
        Ok(Reservation::Fresh)
    }

    fn last_signed_round(&self) -> Result<Option<RoundIndex>, JournalError> {
        Ok(self
            .state
            .lock()
            .map_err(|_| poisoned())?
            .signed
            .keys()
            .next_back()
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainbet_domain::{Digest, SubmissionStatus};
    use std::io::Write;

    #[test]
    fn test_submission_log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submissions.jsonl");
        let tx = Digest::of(&[b"tx"]);

        {
            let log = JsonlSubmissionLog::open(&path).unwrap();
            log.append(&SubmissionRecord::pending(RoundIndex(3))).unwrap();
            log.append(&SubmissionRecord::new(
                RoundIndex(3),
                Some(tx),
                SubmissionStatus::Submitted,
            ))
            .unwrap();
        }

        let log = JsonlSubmissionLog::open(&path).unwrap();
        assert_eq!(log.records().unwrap().len(), 2);
        let latest = log.latest(RoundIndex(3)).unwrap().unwrap();
        assert_eq!(latest.status, SubmissionStatus::Submitted);
        assert_eq!(latest.tx_hash, Some(tx));
    }

    #[test]
    fn test_signature_journal_conflict_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signatures.jsonl");
        let first = Digest::of(&[b"first"]);
        let second = Digest::of(&[b"second"]);

        {
            let journal = JsonlSignatureJournal::open(&path).unwrap();
            assert_eq!(
                journal.reserve(RoundIndex(7), first).unwrap(),
                Reservation::Fresh
            );
        }

        let journal = JsonlSignatureJournal::open(&path).unwrap();
        assert_eq!(journal.last_signed_round().unwrap(), Some(RoundIndex(7)));
        assert_eq!(
            journal.reserve(RoundIndex(7), first).unwrap(),
            Reservation::Repeat
        );
        assert_eq!(
            journal.reserve(RoundIndex(7), second).unwrap(),
            Reservation::Conflict { signed: first }
        );
    }

    #[test]
    fn test_torn_last_line_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submissions.jsonl");
        {
            let log = JsonlSubmissionLog::open(&path).unwrap();
            log.append(&SubmissionRecord::pending(RoundIndex(1))).unwrap();
        }
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "{{\"round\":2,\"tx_ha").unwrap();
        drop(file);

        let log = JsonlSubmissionLog::open(&path).unwrap();
        assert_eq!(log.records().unwrap().len(), 1);
        log.append(&SubmissionRecord::pending(RoundIndex(2))).unwrap();
        drop(log);

        let log = JsonlSubmissionLog::open(&path).unwrap();
        assert_eq!(log.records().unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_middle_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signatures.jsonl");
        std::fs::write(&path, "not json\n{}\n").unwrap();

        match JsonlSignatureJournal::open(&path) {
            Err(JournalError::Corrupt { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected corruption, got {:?}", other.err()),
        }
    }
}
