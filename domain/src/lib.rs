//! Domain layer for chainbet-quorum
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure, async runtimes or I/O.
//!
//! # Core Concepts
//!
//! ## Round
//!
//! A round is one decision cycle driven by every replica in lockstep:
//!
//! ```text
//! COLLECT_FACTS → FACTS_AGREED → DECIDE → BUILD_TX → COLLECT_SIGNATURES
//!     → SIGNATURES_AGREED → SUBMIT → CONFIRMED        (or FAILED)
//! ```
//!
//! ## Agreement
//!
//! Replicas never trust each other's computation. They propose locally
//! observed values and only act on what the consensus substrate agreed on.
//! Everything derived from agreed input (decision, payload) is a pure function,
//! so every honest replica computes byte-identical results.

pub mod chain;
pub mod core;
pub mod decision;
pub mod payload;
pub mod quorum;
pub mod round;
pub mod submission;
pub mod util;

// Re-export commonly used types
pub use chain::{Bet, Chain, Fact, Observation, ObservationKey};
pub use core::{
    error::DomainError,
    hash::{Address, Digest, PayloadHash, TxHash},
    ids::{ReplicaId, RoundIndex},
};
pub use decision::{
    engine::{Decision, Verdict, decide},
    policy::PrizePolicy,
};
pub use payload::{
    encoding::{CallOperation, MultiSendCall},
    entities::{PayloadContext, SignatureShare, SignedPayload, TransactionPayload, signing_bytes},
    builder::build_payload,
};
pub use quorum::{Agreement, AgreementParams, ConsensusPhase, Proposal, QuorumRule, resolve_agreement};
pub use round::{
    entities::{Round, RoundOutcome},
    phase::{FailureKind, RoundFailure, RoundPhase},
    table::RoundTable,
};
pub use submission::{Receipt, SubmissionRecord, SubmissionStatus, latest_records};
pub use util::WriteOnce;
