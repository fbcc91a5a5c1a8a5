//! Shared fixtures for the fleet scenarios.

#![allow(dead_code)]

use chainbet_application::{NoProgress, ReplicaSettings, RetryPolicy, RoundParams, RoundProgressNotifier};
use chainbet_domain::{Address, AgreementParams, PayloadContext, ReplicaId};
use chainbet_infrastructure::{LocalFleet, LocalFleetBuilder, StaticHolderSource};
use std::sync::Arc;
use std::time::Duration;

pub const STAKE: u128 = 10_000;
pub const POOL: u128 = 50_000;

pub fn bettor() -> Address {
    Address::from_bytes([0xab; 20])
}

pub fn context() -> PayloadContext {
    PayloadContext {
        safe: Address::from_bytes([0x5a; 20]),
        betting_contract: Address::from_bytes([0xbe; 20]),
        multisend: Address::from_bytes([0x3d; 20]),
        starting_nonce: 10,
        signature_threshold: 3,
    }
}

/// A context whose payloads nobody else builds
pub fn faulty_context(replica: u32) -> PayloadContext {
    PayloadContext {
        starting_nonce: 500 + u64::from(replica),
        ..context()
    }
}

pub fn rounds(max_rounds: u64) -> RoundParams {
    RoundParams::default()
        .with_round_timeout(Duration::from_secs(5))
        .with_round_interval(Duration::from_millis(10))
        .with_confirmation_poll(Duration::from_millis(5))
        .with_max_rounds(max_rounds)
}

pub fn settings(max_rounds: u64) -> ReplicaSettings {
    ReplicaSettings::new(
        ReplicaId(0),
        context(),
        AgreementParams {
            quorum: 3,
            signature_threshold: 3,
        },
    )
    .with_rounds(rounds(max_rounds))
    .with_retry(RetryPolicy::once())
}

/// Four replicas observing Arbitrum 1000 and Base 1200
pub fn fleet(settings: ReplicaSettings) -> LocalFleetBuilder {
    LocalFleet::builder(settings, 4, Arc::new(StaticHolderSource::new(1000, 1200))).with_pool(POOL)
}

pub fn no_progress() -> Arc<dyn RoundProgressNotifier> {
    Arc::new(NoProgress)
}
