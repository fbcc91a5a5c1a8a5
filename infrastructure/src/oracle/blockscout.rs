//! Blockscout explorer client.

use super::{TokenEndpoint, holder_count_from_response};
use async_trait::async_trait;
use chainbet_application::{HolderCount, HolderCountSource, OracleError};
use chainbet_domain::Chain;
use chrono::Utc;
use std::time::Duration;
use tracing::debug;

pub struct BlockscoutHolderSource {
    client: reqwest::Client,
    arbitrum: TokenEndpoint,
    base: TokenEndpoint,
}

impl BlockscoutHolderSource {
    pub fn new(
        arbitrum: TokenEndpoint,
        base: TokenEndpoint,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Transient(format!("could not build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            arbitrum,
            base,
        })
    }

    fn endpoint(&self, chain: Chain) -> &TokenEndpoint {
        match chain {
            Chain::Arbitrum => &self.arbitrum,
            Chain::Base => &self.base,
        }
    }
}

fn classify(error: reqwest::Error) -> OracleError {
    if error.is_timeout() {
        OracleError::Timeout
    } else if error.is_decode() {
        OracleError::Malformed(error.to_string())
    } else {
        OracleError::Transient(error.to_string())
    }
}

#[async_trait]
impl HolderCountSource for BlockscoutHolderSource {
    async fn holder_count(&self, chain: Chain) -> Result<HolderCount, OracleError> {
        let url = self.endpoint(chain).url();
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(classify)?;
        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::Transient(format!("{} returned {}", url, status)));
        }
        if !status.is_success() {
            return Err(OracleError::Malformed(format!("{} returned {}", url, status)));
        }

        let body: serde_json::Value = response.json().await.map_err(classify)?;
        Ok(HolderCount {
            count: holder_count_from_response(&body)?,
            as_of: Utc::now(),
        })
    }
}
