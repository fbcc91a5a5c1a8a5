//! Replica identity and participant set (`[replica]`, `[[participants]]`,
//! `[quorum]` sections)
//!
//! ```toml
//! [replica]
//! id = 0
//! key_seed = "0x…"          # 32-byte hex; local fleets derive keys instead
//!
//! [[participants]]
//! id = 0
//! public_key = "0x…"        # ed25519, 32-byte hex
//!
//! [quorum]
//! rule = "byzantine"        # or "majority", "unanimous", "atleast:N", "N%"
//! signature_threshold = 3   # defaults to the rule's minimum
//! ```

use chainbet_domain::QuorumRule;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReplicaConfig {
    pub id: u32,
    pub key_seed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileParticipant {
    pub id: u32,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileQuorumConfig {
    /// Agreement rule for facts and payloads
    pub rule: String,
    pub signature_threshold: Option<usize>,
}

impl Default for FileQuorumConfig {
    fn default() -> Self {
        Self {
            rule: "byzantine".to_string(),
            signature_threshold: None,
        }
    }
}

impl FileQuorumConfig {
    pub fn parse_rule(&self) -> Result<QuorumRule, String> {
        self.rule.parse()
    }
}
