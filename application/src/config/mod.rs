//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`RoundParams`]: round loop control (deadline, pacing, limits)
//! - [`RetryPolicy`]: bounded retry for oracle and ledger calls
//! - [`ReplicaSettings`]: container handed to each replica

pub mod replica_settings;
pub mod retry;
pub mod round_params;

pub use replica_settings::ReplicaSettings;
pub use retry::RetryPolicy;
pub use round_params::RoundParams;
