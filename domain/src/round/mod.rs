//! Round state
//!
//! - [`phase::RoundPhase`]: the state machine's states and legal transitions
//! - [`entities::Round`]: per-round state with write-once derived fields
//! - [`table::RoundTable`]: rounds addressed by index, active and archived

pub mod entities;
pub mod phase;
pub mod table;

pub use entities::{Round, RoundOutcome};
pub use phase::{FailureKind, RoundFailure, RoundPhase};
pub use table::RoundTable;
