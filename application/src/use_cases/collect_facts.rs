//! Collect Facts use case
//!
//! Reads everything a replica proposes during `COLLECT_FACTS`: holder counts
//! for both chains plus the pending bet and pool balance from the ledger.
//! Reads only; no side effects.

use crate::config::RetryPolicy;
use crate::ports::ledger::LedgerGateway;
use crate::ports::oracle::HolderCountSource;
use crate::use_cases::run_round::RoundError;
use crate::use_cases::shared::{RetryError, ledger_failure, with_retry};
use chainbet_domain::{Chain, Fact, Observation};
use futures::future::try_join;
use std::sync::Arc;
use tracing::debug;

pub struct CollectFactsUseCase {
    source: Arc<dyn HolderCountSource>,
    ledger: Arc<dyn LedgerGateway>,
    retry: RetryPolicy,
}

impl CollectFactsUseCase {
    pub fn new(
        source: Arc<dyn HolderCountSource>,
        ledger: Arc<dyn LedgerGateway>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            ledger,
            retry,
        }
    }

    /// Holder count for one chain, retried within the policy budget.
    ///
    /// Any failure that survives the retries becomes `OracleUnavailable`.
    pub async fn fetch_fact(&self, chain: Chain) -> Result<Fact, RoundError> {
        let what = format!("holder count ({})", chain);
        let count = with_retry(&self.retry, &what, || self.source.holder_count(chain))
            .await
            .map_err(|e| {
                let message = match e {
                    RetryError::Fatal(e) => e.to_string(),
                    RetryError::Exhausted { attempts, last } => {
                        format!("{} after {} attempts", last, attempts)
                    }
                };
                RoundError::OracleUnavailable { chain, message }
            })?;

        debug!("{} holders on {} as of {}", count.count, chain, count.as_of);
        Ok(Fact::new(chain, count.count, count.as_of))
    }

    /// Full local observation. Both chains are read concurrently.
    pub async fn observe(&self) -> Result<Observation, RoundError> {
        let (arbitrum, base) =
            try_join(self.fetch_fact(Chain::Arbitrum), self.fetch_fact(Chain::Base)).await?;

        let pending_bet = with_retry(&self.retry, "pending bet", || self.ledger.pending_bet())
            .await
            .map_err(ledger_failure)?;
        let pool_balance = with_retry(&self.retry, "pool balance", || self.ledger.pool_balance())
            .await
            .map_err(ledger_failure)?;

        Ok(Observation::new(arbitrum, base, pending_bet, pool_balance))
    }
}
