//! Quorum agreement domain
//!
//! This module contains the rules replicas use to turn individual proposals
//! into one canonical value per round phase.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  Round phases with a consensus checkpoint                          │
//! ├────────────────────────────────────────────────────────────────────┤
//! │  COLLECT_FACTS       → Proposal::Facts      → Agreement::Facts      │
//! │  BUILD_TX            → Proposal::Payload    → Agreement::Payload    │
//! │  COLLECT_SIGNATURES  → Proposal::Signature  → Agreement::Signatures │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The substrate that collects proposals is external; it only has to call
//! [`resolve_agreement`] to produce the value it delivers.

pub mod agreement;
pub mod rule;

// Re-export main types
pub use agreement::{Agreement, AgreementParams, ConsensusPhase, Proposal, resolve_agreement};
pub use rule::QuorumRule;
