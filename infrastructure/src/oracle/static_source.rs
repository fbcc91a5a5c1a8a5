//! Fixed holder counts.

use async_trait::async_trait;
use chainbet_application::{HolderCount, HolderCountSource, OracleError};
use chainbet_domain::Chain;
use chrono::Utc;
use std::sync::Mutex;

pub struct StaticHolderSource {
    arbitrum: u64,
    base: u64,
    failures: Mutex<u32>,
}

impl StaticHolderSource {
    pub fn new(arbitrum: u64, base: u64) -> Self {
        Self {
            arbitrum,
            base,
            failures: Mutex::new(0),
        }
    }

    /// The next `count` queries fail with a transient error
    pub fn fail_next(self, count: u32) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            *failures = count;
        }
        self
    }
}

#[async_trait]
impl HolderCountSource for StaticHolderSource {
    async fn holder_count(&self, chain: Chain) -> Result<HolderCount, OracleError> {
        if let Ok(mut failures) = self.failures.lock()
            && *failures > 0
        {
            *failures -= 1;
            return Err(OracleError::Transient(format!(
                "{} explorer unavailable",
                chain
            )));
        }

        let count = match chain {
            Chain::Arbitrum => self.arbitrum,
            Chain::Base => self.base,
        };
        Ok(HolderCount {
            count,
            as_of: Utc::now(),
        })
    }
}
