//! Ledger gateway port
//!
//! The multisig wallet plus the betting contract, seen as one external
//! service: it reports the pending bet and pool, accepts signed payloads and
//! reports finality.

use async_trait::async_trait;
use chainbet_domain::{Bet, SignedPayload, TransactionPayload, TxHash};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// RPC unreachable, node lagging; worth retrying
    #[error("Transient ledger error: {0}")]
    Transient(String),

    /// Malformed transaction, bad signatures, revert on submission
    #[error("Permanent ledger error: {0}")]
    Permanent(String),

    #[error("Ledger call timed out")]
    Timeout,
}

impl LedgerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transient(_) | LedgerError::Timeout)
    }
}

/// Result of handing a signed payload to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The ledger accepted a new transaction
    Accepted { tx_hash: TxHash },
    /// The nonce slot was already executed, by another replica or an earlier
    /// attempt. Not an error.
    AlreadyResolved { tx_hash: Option<TxHash> },
}

impl SubmitOutcome {
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            SubmitOutcome::Accepted { tx_hash } => Some(*tx_hash),
            SubmitOutcome::AlreadyResolved { tx_hash } => *tx_hash,
        }
    }
}

/// Finality status of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Pending,
    Final { block: u64 },
    Reverted { reason: String },
}

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Oldest unresolved bet, if any
    async fn pending_bet(&self) -> Result<Option<Bet>, LedgerError>;

    /// Funds the multisig can pay prizes from
    async fn pool_balance(&self) -> Result<u128, LedgerError>;

    async fn submit(
        &self,
        payload: &TransactionPayload,
        signed: &SignedPayload,
    ) -> Result<SubmitOutcome, LedgerError>;

    async fn confirmation(&self, tx_hash: &TxHash) -> Result<Confirmation, LedgerError>;
}
