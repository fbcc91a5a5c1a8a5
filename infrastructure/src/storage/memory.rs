//! In-memory stores. State is lost when the process exits.

use super::check_reservation;
use chainbet_application::{JournalError, Reservation, SignatureJournal, SubmissionLog};
use chainbet_domain::{PayloadHash, RoundIndex, SubmissionRecord};
use std::collections::BTreeMap;
use std::sync::Mutex;

fn poisoned() -> JournalError {
    JournalError::Io("store lock poisoned".to_string())
}

#[derive(Default)]
pub struct InMemorySubmissionLog {
    records: Mutex<Vec<SubmissionRecord>>,
}

impl InMemorySubmissionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubmissionLog for InMemorySubmissionLog {
    fn append(&self, record: &SubmissionRecord) -> Result<(), JournalError> {
        self.records.lock().map_err(|_| poisoned())?.push(record.clone());
        Ok(())
    }

    fn records(&self) -> Result<Vec<SubmissionRecord>, JournalError> {
        Ok(self.records.lock().map_err(|_| poisoned())?.clone())
    }
}

#[derive(Default)]
pub struct InMemorySignatureJournal {
    signed: Mutex<BTreeMap<RoundIndex, PayloadHash>>,
}

impl InMemorySignatureJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignatureJournal for InMemorySignatureJournal {
    fn reserve(
        &self,
        round: RoundIndex,
        payload_hash: PayloadHash,
    ) -> Result<Reservation, JournalError> {
        let mut signed = self.signed.lock().map_err(|_| poisoned())?;
        if let Some(reservation) = check_reservation(&signed, round, payload_hash) {
            return Ok(reservation);
        }
        signed.insert(round, payload_hash);
        Ok(Reservation::Fresh)
    }

    fn last_signed_round(&self) -> Result<Option<RoundIndex>, JournalError> {
        Ok(self
            .signed
            .lock()
            .map_err(|_| poisoned())?
            .keys()
            .next_back()
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainbet_domain::{Digest, SubmissionStatus};

    #[test]
    fn test_reserve_fresh_repeat_conflict() {
        let journal = InMemorySignatureJournal::new();
        let a = Digest::of(&[b"a"]);
        let b = Digest::of(&[b"b"]);

        assert_eq!(journal.reserve(RoundIndex(1), a).unwrap(), Reservation::Fresh);
        assert_eq!(journal.reserve(RoundIndex(1), a).unwrap(), Reservation::Repeat);
        assert_eq!(
            journal.reserve(RoundIndex(1), b).unwrap(),
            Reservation::Conflict { signed: a }
        );
        assert_eq!(journal.reserve(RoundIndex(2), b).unwrap(), Reservation::Fresh);
        assert_eq!(journal.last_signed_round().unwrap(), Some(RoundIndex(2)));
    }

    #[test]
    fn test_latest_submission_record() {
        let log = InMemorySubmissionLog::new();
        let tx = Digest::of(&[b"tx"]);
        log.append(&SubmissionRecord::pending(RoundIndex(0))).unwrap();
        log.append(&SubmissionRecord::new(
            RoundIndex(0),
            Some(tx),
            SubmissionStatus::Submitted,
        ))
        .unwrap();

        let latest = log.latest(RoundIndex(0)).unwrap().unwrap();
        assert_eq!(latest.status, SubmissionStatus::Submitted);
        assert_eq!(latest.tx_hash, Some(tx));
        assert!(log.latest(RoundIndex(1)).unwrap().is_none());
    }
}
