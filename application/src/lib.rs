//! Application layer for chainbet-quorum
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ReplicaSettings, RetryPolicy, RoundParams};
pub use ports::{
    journal::{JournalError, Reservation, SignatureJournal, SubmissionLog},
    ledger::{Confirmation, LedgerError, LedgerGateway, SubmitOutcome},
    oracle::{HolderCount, HolderCountSource, OracleError},
    progress::{NoProgress, RoundProgressNotifier},
    round_logger::{NoRoundEventLogger, RoundEvent, RoundEventLogger},
    signer::{Signer, SignerError},
    substrate::{ConsensusSubstrate, SubstrateError},
};
pub use use_cases::collect_facts::CollectFactsUseCase;
pub use use_cases::coordinate_tx::TransactionCoordinator;
pub use use_cases::replica_service::{ReplicaReport, ReplicaService, ReplicaServiceError};
pub use use_cases::run_round::{ReplicaPorts, RoundError, RunRoundUseCase};
