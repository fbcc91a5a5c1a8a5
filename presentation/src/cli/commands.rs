//! CLI command definitions

use chainbet_domain::{Address, Chain};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for round reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every round of every replica
    Full,
    /// One line per replica plus a cross-replica check
    Summary,
    /// JSON output
    Json,
}

/// CLI arguments for chainbet-quorum
#[derive(Parser, Debug)]
#[command(name = "chainbet-quorum")]
#[command(author, version, about = "Replicated betting agent settling Arbitrum vs Base holder-count bets")]
#[command(long_about = r#"
Chainbet Quorum runs a fleet of replicas that jointly decide and settle bets
on which chain, Arbitrum or Base, has more token holders.

Every round goes through the same phases on each replica:
1. Collect facts: observe holder counts and agree on one observation
2. Decide: compute the verdict and prize from the agreed observation
3. Build and sign: agree on one multisig payload and collect threshold signatures
4. Submit: send the transaction once and wait for finality

Configuration files are loaded from (in priority order):
1. CHAINBET_* environment variables
2. --config <path>     Explicit config file
3. ./chainbet.toml     Project-level config
4. ~/.config/chainbet-quorum/config.toml   Global config

Example:
  chainbet-quorum --rounds 1 --bet-choice base --arbitrum-holders 1000 --base-holders 1200
  chainbet-quorum -n 7 --rounds 3 --output json
"#)]
pub struct Cli {
    /// Number of replicas in the local fleet (when no participants are configured)
    #[arg(short = 'n', long, default_value_t = 4, value_name = "N")]
    pub replicas: u32,

    /// Stop after this many rounds per replica
    #[arg(short, long, value_name = "N")]
    pub rounds: Option<u64>,

    /// Fixed Arbitrum holder count instead of querying an explorer
    #[arg(long, value_name = "COUNT", requires = "base_holders")]
    pub arbitrum_holders: Option<u64>,

    /// Fixed Base holder count instead of querying an explorer
    #[arg(long, value_name = "COUNT", requires = "arbitrum_holders")]
    pub base_holders: Option<u64>,

    /// Place a bet on this chain before the first round
    #[arg(long, value_name = "CHAIN")]
    pub bet_choice: Option<Chain>,

    /// Stake of the placed bet
    #[arg(long, default_value_t = 10_000, value_name = "AMOUNT")]
    pub bet_stake: u128,

    /// Bettor receiving the prize
    #[arg(long, value_name = "ADDRESS")]
    pub bettor: Option<Address>,

    /// Prize pool funding the betting contract
    #[arg(long, default_value_t = 100_000, value_name = "AMOUNT")]
    pub pool: u128,

    /// Keep submission logs and signing journals in memory only
    #[arg(long)]
    pub in_memory: bool,

    /// Also write daily-rotated log files into this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// Fixed holder counts, if both were given
    pub fn static_counts(&self) -> Option<(u64, u64)> {
        self.arbitrum_holders.zip(self.base_holders)
    }

    /// Bettor address, defaulting to a fixed local one
    pub fn bettor_address(&self) -> Address {
        self.bettor.unwrap_or(Address::from_bytes([0xab; 20]))
    }
}
