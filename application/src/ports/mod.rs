//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod journal;
pub mod ledger;
pub mod oracle;
pub mod progress;
pub mod round_logger;
pub mod signer;
pub mod substrate;
