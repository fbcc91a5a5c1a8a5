//! Prize policy

use serde::{Deserialize, Serialize};

/// Scaling rule for prizes.
///
/// A winning bettor receives `stake × holder_difference / holders_per_unit`
/// wei, capped at the pool balance. With the default of 1000, a stake of
/// 10 000 wei on a chain leading by 200 holders pays 2 000 wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrizePolicy {
    pub holders_per_unit: u64,
}

impl Default for PrizePolicy {
    fn default() -> Self {
        Self {
            holders_per_unit: 1000,
        }
    }
}

impl PrizePolicy {
    pub fn new(holders_per_unit: u64) -> Self {
        Self { holders_per_unit }
    }

    /// Prize for a winning stake. Monotonic in `difference`, never above `pool`.
    pub fn prize(&self, stake: u128, difference: u64, pool: u128) -> u128 {
        let divisor = u128::from(self.holders_per_unit.max(1));
        let raw = stake.saturating_mul(u128::from(difference)) / divisor;
        raw.min(pool)
    }
}
