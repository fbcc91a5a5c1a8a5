//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Round {round}: {field} is already set to a different value")]
    AlreadySet { round: u64, field: &'static str },

    #[error("Round {round}: invalid transition {from} -> {to}")]
    InvalidTransition {
        round: u64,
        from: &'static str,
        to: &'static str,
    },

    #[error("Round {0} is not open")]
    RoundNotOpen(u64),

    #[error("Round {round} cannot be opened after round {last}")]
    NonMonotonicRound { round: u64, last: u64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("Malformed call data: {0}")]
    MalformedCallData(String),
}
