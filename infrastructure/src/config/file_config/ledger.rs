//! Ledger configuration from TOML (`[ledger]` section)

use serde::{Deserialize, Serialize};

/// Contract addresses and the nonce of round #0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLedgerConfig {
    pub safe: String,
    pub betting_contract: String,
    pub multisend: String,
    pub starting_nonce: u64,
}

impl Default for FileLedgerConfig {
    fn default() -> Self {
        Self {
            safe: "0x0000000000000000000000000000000000005afe".to_string(),
            betting_contract: "0x000000000000000000000000000000000000be77".to_string(),
            multisend: "0x00000000000000000000000000000000000035e0".to_string(),
            starting_nonce: 0,
        }
    }
}
