//! Shared utilities for use cases.
//!
//! Contains cancellation checking and the bounded retry loop used for
//! oracle and ledger calls.

use crate::config::RetryPolicy;
use crate::ports::ledger::LedgerError;
use crate::ports::oracle::OracleError;
use crate::use_cases::run_round::RoundError;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Check if cancellation has been requested.
///
/// Returns `Err(RoundError::Cancelled)` if the token exists and is cancelled.
pub(crate) fn check_cancelled(token: &Option<CancellationToken>) -> Result<(), RoundError> {
    if let Some(token) = token
        && token.is_cancelled()
    {
        return Err(RoundError::Cancelled);
    }
    Ok(())
}

/// Errors the retry loop knows how to classify
pub(crate) trait Retryable: std::fmt::Display {
    fn is_transient(&self) -> bool;

    /// Error to use when a single call exceeds the call timeout
    fn timed_out() -> Self;
}

impl Retryable for OracleError {
    fn is_transient(&self) -> bool {
        OracleError::is_transient(self)
    }

    fn timed_out() -> Self {
        OracleError::Timeout
    }
}

impl Retryable for LedgerError {
    fn is_transient(&self) -> bool {
        LedgerError::is_transient(self)
    }

    fn timed_out() -> Self {
        LedgerError::Timeout
    }
}

/// Why a retried call gave up
#[derive(Debug)]
pub(crate) enum RetryError<E> {
    /// Non-transient error; not retried
    Fatal(E),
    /// Every attempt failed with a transient error
    Exhausted { attempts: u32, last: E },
}

/// Run `call` until it succeeds, fails permanently, or the attempt budget is
/// spent. Each attempt is bounded by the policy's call timeout.
pub(crate) async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut call: F,
) -> Result<T, RetryError<E>>
where
    E: Retryable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let result = match tokio::time::timeout(policy.call_timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(E::timed_out()),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(RetryError::Fatal(e)),
            Err(e) if attempt >= policy.max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(e) => {
                let delay = policy.backoff(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what, attempt, policy.max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Ledger failures mapped onto the round error taxonomy
pub(crate) fn ledger_failure(error: RetryError<LedgerError>) -> RoundError {
    match error {
        RetryError::Fatal(e) => RoundError::PermanentLedger(e.to_string()),
        RetryError::Exhausted { attempts, last } => RoundError::TransientNetwork {
            attempts,
            message: last.to_string(),
        },
    }
}
