//! Oracle configuration from TOML (`[oracle]` section)
//!
//! The retry settings apply to every network call a replica makes, ledger
//! reads and submissions included.
//!
//! ```toml
//! [oracle]
//! request_timeout_seconds = 15
//! max_attempts = 4
//! initial_backoff_ms = 500
//! max_backoff_ms = 8000
//!
//! [oracle.arbitrum]
//! base_url = "https://arbitrum.blockscout.com"
//! token = "0x…"
//! ```

use crate::oracle::TokenEndpoint;
use chainbet_application::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTokenEndpoint {
    pub base_url: String,
    pub token: String,
}

impl FileTokenEndpoint {
    pub fn to_endpoint(&self) -> TokenEndpoint {
        TokenEndpoint {
            base_url: self.base_url.clone(),
            token: self.token.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOracleConfig {
    pub arbitrum: FileTokenEndpoint,
    pub base: FileTokenEndpoint,
    pub request_timeout_seconds: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for FileOracleConfig {
    fn default() -> Self {
        Self {
            arbitrum: FileTokenEndpoint {
                base_url: "https://arbitrum.blockscout.com".to_string(),
                token: String::new(),
            },
            base: FileTokenEndpoint {
                base_url: "https://base.blockscout.com".to_string(),
                token: String::new(),
            },
            request_timeout_seconds: 15,
            max_attempts: 4,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl FileOracleConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_backoff(
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            )
            .with_call_timeout(Duration::from_secs(self.request_timeout_seconds))
    }

    /// Both chains have a token to query
    pub fn has_tokens(&self) -> bool {
        !self.arbitrum.token.is_empty() && !self.base.token.is_empty()
    }
}
