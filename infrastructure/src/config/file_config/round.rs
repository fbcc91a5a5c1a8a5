//! Round pacing, prize and journal configuration (`[round]`, `[prize]`,
//! `[journal]` sections)
//!
//! ```toml
//! [round]
//! timeout_seconds = 120
//! interval_seconds = 30
//! confirmation_poll_ms = 2000
//! max_rounds = 10
//!
//! [prize]
//! holders_per_unit = 1000
//!
//! [journal]
//! dir = ".chainbet"
//! ```

use chainbet_application::RoundParams;
use chainbet_domain::PrizePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoundConfig {
    pub timeout_seconds: u64,
    pub interval_seconds: u64,
    pub confirmation_poll_ms: u64,
    pub max_rounds: Option<u64>,
    pub start_round: u64,
}

impl Default for FileRoundConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 120,
            interval_seconds: 30,
            confirmation_poll_ms: 2_000,
            max_rounds: None,
            start_round: 0,
        }
    }
}

impl FileRoundConfig {
    pub fn to_round_params(&self) -> RoundParams {
        let params = RoundParams::default()
            .with_round_timeout(Duration::from_secs(self.timeout_seconds))
            .with_round_interval(Duration::from_secs(self.interval_seconds))
            .with_confirmation_poll(Duration::from_millis(self.confirmation_poll_ms))
            .with_start_round(self.start_round);
        match self.max_rounds {
            Some(max) => params.with_max_rounds(max),
            None => params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePrizeConfig {
    /// Holder difference worth one unit of prize per unit staked
    pub holders_per_unit: u64,
}

impl Default for FilePrizeConfig {
    fn default() -> Self {
        Self {
            holders_per_unit: PrizePolicy::default().holders_per_unit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileJournalConfig {
    /// Directory holding the submission log, signature journal and round events
    pub dir: String,
    /// Keep journals in memory only
    pub in_memory: bool,
}

impl Default for FileJournalConfig {
    fn default() -> Self {
        Self {
            dir: ".chainbet".to_string(),
            in_memory: false,
        }
    }
}

impl FileJournalConfig {
    pub fn replica_dir(&self, replica: u32) -> PathBuf {
        PathBuf::from(&self.dir).join(format!("replica-{}", replica))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_params_from_file() {
        let config = FileRoundConfig {
            timeout_seconds: 60,
            max_rounds: Some(3),
            ..Default::default()
        };
        let params = config.to_round_params();
        assert_eq!(params.round_timeout, Duration::from_secs(60));
        assert_eq!(params.round_interval, Duration::from_secs(30));
        assert_eq!(params.max_rounds, Some(3));
    }

    #[test]
    fn test_replica_dir() {
        let journal = FileJournalConfig::default();
        assert_eq!(
            journal.replica_dir(2),
            PathBuf::from(".chainbet").join("replica-2")
        );
    }
}
