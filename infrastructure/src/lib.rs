//! Infrastructure layer for chainbet-quorum
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: holder-count oracles, the in-process substrate, signing
//! keys, the multisig ledger and the persistent journals. It also loads the
//! configuration file and wires local fleets together.

pub mod config;
pub mod fleet;
pub mod ledger;
pub mod logging;
pub mod oracle;
pub mod signer;
pub mod storage;
pub mod substrate;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use fleet::{FleetError, FleetReplica, LocalFleet, LocalFleetBuilder};
pub use ledger::{InMemoryLedger, LedgerTransaction, TransactionStatus};
pub use logging::JsonlRoundEventLogger;
#[cfg(feature = "blockscout")]
pub use oracle::BlockscoutHolderSource;
pub use oracle::{StaticHolderSource, TokenEndpoint};
pub use signer::Ed25519Signer;
pub use storage::{
    InMemorySignatureJournal, InMemorySubmissionLog, JsonlSignatureJournal, JsonlSubmissionLog,
};
pub use substrate::LocalQuorumSubstrate;
