//! Decision engine
//!
//! [`decide`] maps an agreed [`Observation`](crate::Observation) to a
//! [`Decision`]. It is a pure function: every replica that received the same
//! agreed observation computes a bit-identical decision and can therefore
//! verify the payload it is asked to sign without trusting the proposer.

pub mod engine;
pub mod policy;

pub use engine::{Decision, Verdict, decide};
pub use policy::PrizePolicy;
