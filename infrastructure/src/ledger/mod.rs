//! Ledger adapters.
//!
//! [`InMemoryLedger`] models the on-chain side of a settlement: a Safe-style
//! multisig that owns the prize pool, a betting contract holding pending bets,
//! and a MultiSend library the Safe delegate-calls into.

mod memory;

pub use memory::{InMemoryLedger, LedgerTransaction, TransactionStatus};
