//! Type definitions for the RunRound use case.

use crate::ports::journal::{JournalError, SignatureJournal, SubmissionLog};
use crate::ports::ledger::LedgerGateway;
use crate::ports::oracle::HolderCountSource;
use crate::ports::round_logger::{NoRoundEventLogger, RoundEventLogger};
use crate::ports::signer::{Signer, SignerError};
use crate::ports::substrate::{ConsensusSubstrate, SubstrateError};
use chainbet_domain::{Chain, DomainError, FailureKind, PayloadHash, RoundIndex, RoundPhase};
use std::sync::Arc;
use thiserror::Error;

/// Errors that end a round
#[derive(Error, Debug)]
pub enum RoundError {
    #[error("Oracle unavailable for {chain}: {message}")]
    OracleUnavailable { chain: Chain, message: String },

    #[error("Network error after {attempts} attempts: {message}")]
    TransientNetwork { attempts: u32, message: String },

    #[error("Round deadline passed during {phase}")]
    Deadline { phase: RoundPhase },

    #[error("Substrate error: {0}")]
    Substrate(#[from] SubstrateError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Permanent ledger error: {0}")]
    PermanentLedger(String),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("Refusing to sign round {round}: payload {signed} was already signed")]
    DoubleSign {
        round: RoundIndex,
        signed: PayloadHash,
    },

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Round state error: {0}")]
    Domain(#[from] DomainError),

    #[error("Round state missing {0}")]
    MissingState(&'static str),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RoundError {
    /// Failure kind recorded on the round
    pub fn kind(&self) -> FailureKind {
        match self {
            RoundError::OracleUnavailable { .. } => FailureKind::OracleUnavailable,
            RoundError::TransientNetwork { .. } => FailureKind::TransientNetwork,
            RoundError::Deadline { phase: RoundPhase::Submit } => FailureKind::TransientNetwork,
            RoundError::Deadline { .. } | RoundError::Substrate(_) => {
                FailureKind::ConsensusTimeout
            }
            RoundError::InvalidPayload(_) | RoundError::Domain(_) => FailureKind::InvalidPayload,
            RoundError::PermanentLedger(_) => FailureKind::PermanentLedger,
            RoundError::Journal(_) | RoundError::MissingState(_) => FailureKind::Storage,
            RoundError::DoubleSign { .. } => FailureKind::DoubleSign,
            RoundError::Signer(_) => FailureKind::SignerUnavailable,
            RoundError::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RoundError::Cancelled)
    }
}

/// External collaborators of one replica
#[derive(Clone)]
pub struct ReplicaPorts {
    pub oracle: Arc<dyn HolderCountSource>,
    pub ledger: Arc<dyn LedgerGateway>,
    pub substrate: Arc<dyn ConsensusSubstrate>,
    pub signer: Arc<dyn Signer>,
    pub submissions: Arc<dyn SubmissionLog>,
    pub journal: Arc<dyn SignatureJournal>,
    pub logger: Arc<dyn RoundEventLogger>,
}

impl ReplicaPorts {
    pub fn new(
        oracle: Arc<dyn HolderCountSource>,
        ledger: Arc<dyn LedgerGateway>,
        substrate: Arc<dyn ConsensusSubstrate>,
        signer: Arc<dyn Signer>,
        submissions: Arc<dyn SubmissionLog>,
        journal: Arc<dyn SignatureJournal>,
    ) -> Self {
        Self {
            oracle,
            ledger,
            substrate,
            signer,
            submissions,
            journal,
            logger: Arc::new(NoRoundEventLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn RoundEventLogger>) -> Self {
        self.logger = logger;
        self
    }
}
