//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod collect_facts;
pub mod coordinate_tx;
pub mod replica_service;
pub mod run_round;
pub(crate) mod shared;

#[cfg(test)]
pub(crate) mod test_support;
