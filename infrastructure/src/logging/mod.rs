//! Round event journal.
//!
//! [`JsonlRoundEventLogger`] appends every phase transition and terminal
//! outcome as one JSON line, implementing the
//! [`RoundEventLogger`](chainbet_application::RoundEventLogger) port.

mod jsonl_round_logger;

pub use jsonl_round_logger::JsonlRoundEventLogger;
