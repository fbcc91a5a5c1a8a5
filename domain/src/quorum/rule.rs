//! Agreement size rules
//!
//! A rule turns the participant count into the number of matching proposals
//! a phase needs before the substrate may deliver a value.

use serde::{Deserialize, Serialize};

/// How many of `n` participants must back a value
///
/// ```
/// use chainbet_domain::QuorumRule;
///
/// assert_eq!(QuorumRule::Byzantine.min_needed(4), 3);
/// assert_eq!(QuorumRule::Majority.min_needed(4), 3);
/// assert_eq!(QuorumRule::Byzantine.min_needed(7), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuorumRule {
    /// Strictly more than 2n/3; survives f faulty replicas out of 3f + 1
    #[default]
    Byzantine,
    /// Strictly more than n/2
    Majority,
    /// Every participant
    Unanimous,
    /// A fixed count regardless of n
    AtLeast(usize),
}

impl QuorumRule {
    pub fn min_needed(&self, participants: usize) -> usize {
        match self {
            QuorumRule::Byzantine => participants * 2 / 3 + 1,
            QuorumRule::Majority => participants / 2 + 1,
            QuorumRule::Unanimous => participants,
            QuorumRule::AtLeast(count) => *count,
        }
    }

    /// Whether `backers` out of `participants` is enough
    pub fn admits(&self, backers: usize, participants: usize) -> bool {
        participants > 0 && backers >= self.min_needed(participants)
    }
}

impl std::fmt::Display for QuorumRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuorumRule::Byzantine => write!(f, "byzantine"),
            QuorumRule::Majority => write!(f, "majority"),
            QuorumRule::Unanimous => write!(f, "unanimous"),
            QuorumRule::AtLeast(count) => write!(f, "at-least:{}", count),
        }
    }
}

impl std::str::FromStr for QuorumRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "byzantine" | "bft" => Ok(QuorumRule::Byzantine),
            "majority" => Ok(QuorumRule::Majority),
            "unanimous" | "all" => Ok(QuorumRule::Unanimous),
            other => match other.split_once(':') {
                Some(("at-least" | "atleast", count)) => count
                    .trim()
                    .parse()
                    .map(QuorumRule::AtLeast)
                    .map_err(|_| format!("Invalid count in quorum rule: {}", s)),
                _ => Err(format!(
                    "Unknown quorum rule: {}. Valid: byzantine, majority, unanimous, at-least:N",
                    s
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byzantine_thresholds() {
        assert_eq!(QuorumRule::Byzantine.min_needed(1), 1);
        assert_eq!(QuorumRule::Byzantine.min_needed(3), 3);
        assert_eq!(QuorumRule::Byzantine.min_needed(4), 3);
        assert_eq!(QuorumRule::Byzantine.min_needed(10), 7);
        // Always strictly more than two thirds
        for n in 1..=30 {
            let needed = QuorumRule::Byzantine.min_needed(n);
            assert!(needed * 3 > n * 2);
            assert!((needed - 1) * 3 <= n * 2);
        }
    }

    #[test]
    fn test_admits() {
        assert!(QuorumRule::Majority.admits(3, 4));
        assert!(!QuorumRule::Majority.admits(2, 4));
        assert!(QuorumRule::AtLeast(2).admits(2, 9));
        assert!(!QuorumRule::Unanimous.admits(0, 0));
    }

    #[test]
    fn test_parse_and_display() {
        for rule in [
            QuorumRule::Byzantine,
            QuorumRule::Majority,
            QuorumRule::Unanimous,
            QuorumRule::AtLeast(5),
        ] {
            assert_eq!(rule.to_string().parse::<QuorumRule>(), Ok(rule));
        }
        assert_eq!("BFT".parse::<QuorumRule>(), Ok(QuorumRule::Byzantine));
        assert_eq!("atleast:2".parse::<QuorumRule>(), Ok(QuorumRule::AtLeast(2)));
        assert!("at-least:many".parse::<QuorumRule>().is_err());
        assert!("loudest".parse::<QuorumRule>().is_err());
    }
}
