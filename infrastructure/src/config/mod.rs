//! Configuration file loading for chainbet-quorum
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CHAINBET_` environment variables (`CHAINBET_ROUND__TIMEOUT_SECONDS=60`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./chainbet.toml` or `./.chainbet.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/chainbet-quorum/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileJournalConfig, FileLedgerConfig, FileOracleConfig,
    FileParticipant, FilePrizeConfig, FileQuorumConfig, FileReplicaConfig, FileRoundConfig,
    FileTokenEndpoint,
};
pub use loader::ConfigLoader;
