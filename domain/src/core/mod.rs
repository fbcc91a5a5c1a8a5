//! Core domain concepts shared across all subdomains.
//!
//! - [`ids::ReplicaId`] / [`ids::RoundIndex`]: who and when
//! - [`hash::Digest`] / [`hash::Address`]: fixed-width identifiers
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod hash;
pub mod ids;
