//! Holder-count oracle port
//!
//! Defines how the application layer reads holder counts from chain explorers.

use async_trait::async_trait;
use chainbet_domain::Chain;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while reading holder counts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Network failure, 5xx, rate limiting; worth retrying
    #[error("Transient oracle error: {0}")]
    Transient(String),

    /// The explorer answered but the response could not be understood
    #[error("Malformed oracle response: {0}")]
    Malformed(String),

    #[error("Oracle call timed out")]
    Timeout,
}

impl OracleError {
    pub fn is_transient(&self) -> bool {
        matches!(self, OracleError::Transient(_) | OracleError::Timeout)
    }
}

/// Holder count as reported by an explorer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolderCount {
    pub count: u64,
    pub as_of: DateTime<Utc>,
}

/// Source of holder counts for one token per chain
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait HolderCountSource: Send + Sync {
    async fn holder_count(&self, chain: Chain) -> Result<HolderCount, OracleError>;
}
