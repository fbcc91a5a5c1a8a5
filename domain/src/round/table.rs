//! Round table: rounds addressed by index

use super::entities::Round;
use crate::core::error::DomainError;
use crate::core::ids::RoundIndex;
use std::collections::BTreeMap;

/// Owns every round a replica knows about.
///
/// At most one round is active at a time. Terminal rounds move to the archive,
/// which keeps the most recent `archive_limit` entries.
#[derive(Debug, Clone)]
pub struct RoundTable {
    active: BTreeMap<RoundIndex, Round>,
    archived: BTreeMap<RoundIndex, Round>,
    last_opened: Option<RoundIndex>,
    archive_limit: usize,
}

impl Default for RoundTable {
    fn default() -> Self {
        Self::new(64)
    }
}

impl RoundTable {
    pub fn new(archive_limit: usize) -> Self {
        Self {
            active: BTreeMap::new(),
            archived: BTreeMap::new(),
            last_opened: None,
            archive_limit: archive_limit.max(1),
        }
    }

    /// Open a new round. Indices must strictly increase.
    pub fn open(&mut self, index: RoundIndex) -> Result<&mut Round, DomainError> {
        if let Some(last) = self.last_opened
            && index <= last
        {
            return Err(DomainError::NonMonotonicRound {
                round: index.value(),
                last: last.value(),
            });
        }
        self.last_opened = Some(index);
        Ok(self.active.entry(index).or_insert_with(|| Round::new(index)))
    }

    /// Next index to open: one past the highest ever opened, or `resume_from`.
    pub fn next_index(&self, resume_from: RoundIndex) -> RoundIndex {
        match self.last_opened {
            Some(last) => last.next().max(resume_from),
            None => resume_from,
        }
    }

    pub fn get(&self, index: RoundIndex) -> Option<&Round> {
        self.active.get(&index).or_else(|| self.archived.get(&index))
    }

    pub fn get_mut(&mut self, index: RoundIndex) -> Result<&mut Round, DomainError> {
        self.active
            .get_mut(&index)
            .ok_or(DomainError::RoundNotOpen(index.value()))
    }

    /// Move a terminal round to the archive.
    pub fn archive(&mut self, index: RoundIndex) -> Result<&Round, DomainError> {
        let round = self
            .active
            .remove(&index)
            .ok_or(DomainError::RoundNotOpen(index.value()))?;
        debug_assert!(round.is_terminal());
        self.archived.insert(index, round);
        while self.archived.len() > self.archive_limit {
            self.archived.pop_first();
        }
        self.archived
            .get(&index)
            .ok_or(DomainError::RoundNotOpen(index.value()))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn archived(&self) -> impl Iterator<Item = &Round> {
        self.archived.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::entities::RoundOutcome;
    use crate::round::phase::RoundPhase;

    fn finish(round: &mut Round) {
        round.advance(RoundPhase::FactsAgreed).unwrap();
        round.advance(RoundPhase::Decide).unwrap();
        round
            .confirm(RoundOutcome::NoAction {
                reason: "no pending bet".to_string(),
            })
            .unwrap();
    }

    #[test]
    fn test_open_is_monotonic() {
        let mut table = RoundTable::default();
        table.open(RoundIndex(0)).unwrap();
        table.open(RoundIndex(1)).unwrap();
        let err = table.open(RoundIndex(1)).unwrap_err();
        assert_eq!(err, DomainError::NonMonotonicRound { round: 1, last: 1 });
        assert_eq!(table.next_index(RoundIndex(0)), RoundIndex(2));
        assert_eq!(table.next_index(RoundIndex(10)), RoundIndex(10));
    }

    #[test]
    fn test_archive_moves_round() {
        let mut table = RoundTable::default();
        finish(table.open(RoundIndex(3)).unwrap());
        assert_eq!(table.active_count(), 1);

        let archived = table.archive(RoundIndex(3)).unwrap();
        assert_eq!(archived.phase(), RoundPhase::Confirmed);
        assert_eq!(table.active_count(), 0);
        assert!(table.get(RoundIndex(3)).is_some());
        assert!(table.get_mut(RoundIndex(3)).is_err());
    }

    #[test]
    fn test_archive_is_bounded() {
        let mut table = RoundTable::new(2);
        for i in 0..5 {
            finish(table.open(RoundIndex(i)).unwrap());
            table.archive(RoundIndex(i)).unwrap();
        }
        let kept: Vec<u64> = table.archived().map(|r| r.index().value()).collect();
        assert_eq!(kept, vec![3, 4]);
    }
}
