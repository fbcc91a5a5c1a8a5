//! Holder-count sources
//!
//! - [`StaticHolderSource`]: fixed counts, for local fleets and tests
//! - [`BlockscoutHolderSource`]: Blockscout explorer API (feature `blockscout`)

#[cfg(feature = "blockscout")]
mod blockscout;
mod static_source;

#[cfg(feature = "blockscout")]
pub use blockscout::BlockscoutHolderSource;
pub use static_source::StaticHolderSource;

use chainbet_application::OracleError;
use serde_json::Value;

/// Explorer endpoint for one chain's token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEndpoint {
    /// e.g. `https://base.blockscout.com`
    pub base_url: String,
    pub token: String,
}

impl TokenEndpoint {
    pub fn url(&self) -> String {
        format!(
            "{}/api/v2/tokens/{}",
            self.base_url.trim_end_matches('/'),
            self.token
        )
    }
}

/// Extract the holder count from a `/api/v2/tokens/<token>` response.
///
/// Explorers report it under `holders` (as a string or a number) or, on
/// newer versions, `holders_count`.
pub fn holder_count_from_response(body: &Value) -> Result<u64, OracleError> {
    let field = ["holders", "holders_count"]
        .iter()
        .find_map(|key| body.get(*key).filter(|v| !v.is_null()))
        .ok_or_else(|| OracleError::Malformed("response has no holder count".to_string()))?;

    match field {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| OracleError::Malformed(format!("holder count {} is not a count", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| OracleError::Malformed(format!("holder count {:?} is not a number", s))),
        other => Err(OracleError::Malformed(format!(
            "unexpected holder count {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_holders_as_string_or_number() {
        assert_eq!(
            holder_count_from_response(&json!({"holders": "1200"})).unwrap(),
            1200
        );
        assert_eq!(
            holder_count_from_response(&json!({"holders": 1000})).unwrap(),
            1000
        );
        assert_eq!(
            holder_count_from_response(&json!({"holders": null, "holders_count": "42"})).unwrap(),
            42
        );
    }

    #[test]
    fn test_malformed_counts() {
        for body in [
            json!({}),
            json!({"holders": "many"}),
            json!({"holders": -3}),
            json!({"holders": [1]}),
        ] {
            assert!(matches!(
                holder_count_from_response(&body),
                Err(OracleError::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_endpoint_url() {
        let endpoint = TokenEndpoint {
            base_url: "https://base.blockscout.com/".to_string(),
            token: "0xabc".to_string(),
        };
        assert_eq!(
            endpoint.url(),
            "https://base.blockscout.com/api/v2/tokens/0xabc"
        );
    }
}
