//! Chains, holder-count facts and the observation replicas propose.
//!
//! An [`Observation`] is everything one replica saw during the collect phase:
//! the holder count on each chain, the first pending bet on the betting
//! contract, and the prize pool balance. Replicas agree on the observation by
//! its [`ObservationKey`], which leaves out the wall-clock timestamps since
//! those legitimately differ between replicas.

use crate::core::error::DomainError;
use crate::core::hash::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chain whose token-holder count is being compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Arbitrum,
    Base,
}

impl Chain {
    pub const ALL: [Chain; 2] = [Chain::Arbitrum, Chain::Base];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Arbitrum => "arbitrum",
            Chain::Base => "base",
        }
    }

    /// Choice code used by the betting contract (1 = Arbitrum, 2 = Base)
    pub fn choice_code(&self) -> u8 {
        match self {
            Chain::Arbitrum => 1,
            Chain::Base => 2,
        }
    }

    pub fn from_choice_code(code: u8) -> Option<Chain> {
        match code {
            1 => Some(Chain::Arbitrum),
            2 => Some(Chain::Base),
            _ => None,
        }
    }

    pub fn other(&self) -> Chain {
        match self {
            Chain::Arbitrum => Chain::Base,
            Chain::Base => Chain::Arbitrum,
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Chain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arbitrum" | "arb" => Ok(Chain::Arbitrum),
            "base" => Ok(Chain::Base),
            other => Err(DomainError::UnknownChain(other.to_string())),
        }
    }
}

/// Holder count observed on one chain at one moment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub chain: Chain,
    pub holders: u64,
    pub observed_at: DateTime<Utc>,
}

impl Fact {
    pub fn new(chain: Chain, holders: u64, observed_at: DateTime<Utc>) -> Self {
        Self {
            chain,
            holders,
            observed_at,
        }
    }
}

/// A pending bet read from the betting contract
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bet {
    pub id: u64,
    /// Chain the bettor expects to have more holders
    pub choice: Chain,
    /// Stake in wei
    pub stake: u128,
    pub bettor: Address,
}

/// Everything a replica proposes during `COLLECT_FACTS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub arbitrum: Fact,
    pub base: Fact,
    pub pending_bet: Option<Bet>,
    /// Prize pool available to the multisig, in wei
    pub pool_balance: u128,
}

/// Comparable part of an [`Observation`], excluding timestamps
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationKey {
    pub arbitrum_holders: u64,
    pub base_holders: u64,
    pub pending_bet: Option<Bet>,
    pub pool_balance: u128,
}

impl Observation {
    pub fn new(arbitrum: Fact, base: Fact, pending_bet: Option<Bet>, pool_balance: u128) -> Self {
        debug_assert_eq!(arbitrum.chain, Chain::Arbitrum);
        debug_assert_eq!(base.chain, Chain::Base);
        Self {
            arbitrum,
            base,
            pending_bet,
            pool_balance,
        }
    }

    pub fn fact(&self, chain: Chain) -> &Fact {
        match chain {
            Chain::Arbitrum => &self.arbitrum,
            Chain::Base => &self.base,
        }
    }

    pub fn holders(&self, chain: Chain) -> u64 {
        self.fact(chain).holders
    }

    pub fn key(&self) -> ObservationKey {
        ObservationKey {
            arbitrum_holders: self.arbitrum.holders,
            base_holders: self.base.holders,
            pending_bet: self.pending_bet.clone(),
            pool_balance: self.pool_balance,
        }
    }

    /// Same facts, ignoring when they were observed
    pub fn agrees_with(&self, other: &Observation) -> bool {
        self.key() == other.key()
    }
}
