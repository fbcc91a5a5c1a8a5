//! Multisig transaction payloads
//!
//! - [`builder::build_payload`]: deterministic payload for a decision
//! - [`encoding`]: call-data encoding for `resolveBet` and MultiSend batches
//! - [`entities`]: payload, signature shares and the agreed signed payload

pub mod builder;
pub mod encoding;
pub mod entities;

pub use builder::build_payload;
pub use encoding::{CallOperation, MultiSendCall};
pub use entities::{PayloadContext, SignatureShare, SignedPayload, TransactionPayload, signing_bytes};
