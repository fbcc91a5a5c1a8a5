//! Local fleet: N replicas in one process.
//!
//! Every replica gets its own signer, stores and round-event journal. They
//! share only the consensus substrate and the ledger, the same way separate
//! processes would share a network and a chain.

use crate::ledger::InMemoryLedger;
use crate::logging::JsonlRoundEventLogger;
use crate::signer::Ed25519Signer;
use crate::storage::{
    InMemorySignatureJournal, InMemorySubmissionLog, JsonlSignatureJournal, JsonlSubmissionLog,
};
use crate::substrate::{DEFAULT_RETENTION, LocalQuorumSubstrate};
use chainbet_application::{
    HolderCountSource, JournalError, ReplicaPorts, ReplicaReport, ReplicaService,
    ReplicaServiceError, ReplicaSettings, RoundProgressNotifier, Signer,
};
use chainbet_domain::{PayloadContext, ReplicaId};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Could not open replica journals: {0}")]
    Journal(#[from] JournalError),

    #[error("Replica failed: {0}")]
    Replica(#[from] ReplicaServiceError),

    #[error("Replica task panicked: {0}")]
    Join(String),

    #[error("Unknown replica {0}")]
    UnknownReplica(ReplicaId),
}

/// Settings and wiring of one fleet member
#[derive(Clone)]
pub struct FleetReplica {
    pub settings: ReplicaSettings,
    pub ports: ReplicaPorts,
}

pub struct LocalFleetBuilder {
    settings: ReplicaSettings,
    participants: u32,
    oracle: Arc<dyn HolderCountSource>,
    oracles: BTreeMap<ReplicaId, Arc<dyn HolderCountSource>>,
    contexts: BTreeMap<ReplicaId, PayloadContext>,
    pool: u128,
    finality_polls: u32,
    retention: u64,
    journal_dir: Option<PathBuf>,
}

impl LocalFleetBuilder {
    /// Replace one replica's oracle
    pub fn with_oracle(mut self, replica: ReplicaId, oracle: Arc<dyn HolderCountSource>) -> Self {
        self.oracles.insert(replica, oracle);
        self
    }

    /// Give one replica a different payload context; it will build payloads
    /// nobody else agrees with
    pub fn with_payload_context(mut self, replica: ReplicaId, context: PayloadContext) -> Self {
        self.contexts.insert(replica, context);
        self
    }

    pub fn with_pool(mut self, pool: u128) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_finality_polls(mut self, polls: u32) -> Self {
        self.finality_polls = polls;
        self
    }

    /// Rounds of agreement slots the shared substrate keeps
    pub fn with_substrate_retention(mut self, rounds: u64) -> Self {
        self.retention = rounds;
        self
    }

    /// Persist journals as JSONL under `dir/replica-<id>/`
    pub fn with_journal_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.journal_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<LocalFleet, JournalError> {
        let ids: Vec<ReplicaId> = (0..self.participants).map(ReplicaId).collect();
        let signers: Vec<Arc<Ed25519Signer>> = ids
            .iter()
            .map(|id| Arc::new(Ed25519Signer::local(*id)))
            .collect();

        let payload = &self.settings.payload;
        let mut ledger = InMemoryLedger::new(
            payload.safe,
            payload.betting_contract,
            payload.multisend,
            self.settings.agreement.signature_threshold,
        )
        .with_starting_nonce(payload.starting_nonce)
        .with_pool(self.pool)
        .with_finality_polls(self.finality_polls);
        for signer in &signers {
            ledger = ledger.with_owner(signer.replica(), signer.verifying_key());
        }
        let ledger = Arc::new(ledger);
        let substrate = Arc::new(
            LocalQuorumSubstrate::new(ids.iter().copied(), self.settings.agreement)
                .with_retention(self.retention),
        );

        let mut replicas = Vec::with_capacity(ids.len());
        for signer in signers {
            let id = signer.replica();
            let oracle = self
                .oracles
                .get(&id)
                .cloned()
                .unwrap_or_else(|| self.oracle.clone());

            let ports = match &self.journal_dir {
                Some(dir) => {
                    let dir = dir.join(format!("replica-{}", id.0));
                    let ports = ReplicaPorts::new(
                        oracle,
                        ledger.clone(),
                        substrate.clone(),
                        signer,
                        Arc::new(JsonlSubmissionLog::open(dir.join("submissions.jsonl"))?),
                        Arc::new(JsonlSignatureJournal::open(dir.join("signatures.jsonl"))?),
                    );
                    match JsonlRoundEventLogger::new(dir.join("rounds.jsonl")) {
                        Some(logger) => ports.with_logger(Arc::new(logger)),
                        None => ports,
                    }
                }
                None => ReplicaPorts::new(
                    oracle,
                    ledger.clone(),
                    substrate.clone(),
                    signer,
                    Arc::new(InMemorySubmissionLog::new()),
                    Arc::new(InMemorySignatureJournal::new()),
                ),
            };

            let mut settings = self.settings.for_replica(id);
            if let Some(context) = self.contexts.get(&id) {
                settings.payload = context.clone();
            }
            replicas.push(FleetReplica { settings, ports });
        }

        Ok(LocalFleet {
            substrate,
            ledger,
            replicas,
        })
    }
}

pub struct LocalFleet {
    substrate: Arc<LocalQuorumSubstrate>,
    ledger: Arc<InMemoryLedger>,
    replicas: Vec<FleetReplica>,
}

impl LocalFleet {
    /// `participants` replicas sharing `settings`, each with its own key
    pub fn builder(
        settings: ReplicaSettings,
        participants: u32,
        oracle: Arc<dyn HolderCountSource>,
    ) -> LocalFleetBuilder {
        LocalFleetBuilder {
            settings,
            participants,
            oracle,
            oracles: BTreeMap::new(),
            contexts: BTreeMap::new(),
            pool: 0,
            finality_polls: 0,
            retention: DEFAULT_RETENTION,
            journal_dir: None,
        }
    }

    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    pub fn substrate(&self) -> &Arc<LocalQuorumSubstrate> {
        &self.substrate
    }

    pub fn replicas(&self) -> &[FleetReplica] {
        &self.replicas
    }

    pub fn replica_ids(&self) -> Vec<ReplicaId> {
        self.replicas.iter().map(|r| r.settings.replica).collect()
    }

    /// A fresh service for one replica, as after a process restart
    pub fn service(&self, replica: ReplicaId) -> Option<ReplicaService> {
        self.replicas
            .iter()
            .find(|r| r.settings.replica == replica)
            .map(|r| ReplicaService::new(r.settings.clone(), r.ports.clone()))
    }

    /// Run every replica until it stops
    pub async fn run(
        &self,
        token: CancellationToken,
        progress: Arc<dyn RoundProgressNotifier>,
    ) -> Result<Vec<ReplicaReport>, FleetError> {
        self.run_replicas(&self.replica_ids(), token, progress).await
    }

    /// Run a subset of the replicas concurrently. Reports are ordered by replica id.
    ///
    /// Cancelling `token` also closes the substrate, so replicas blocked on
    /// an agreement return at once. A closed fleet cannot run again.
    pub async fn run_replicas(
        &self,
        replicas: &[ReplicaId],
        token: CancellationToken,
        progress: Arc<dyn RoundProgressNotifier>,
    ) -> Result<Vec<ReplicaReport>, FleetError> {
        let mut tasks = JoinSet::new();
        for id in replicas {
            let service = self
                .service(*id)
                .ok_or(FleetError::UnknownReplica(*id))?
                .with_cancellation(token.clone());
            let progress = progress.clone();
            tasks.spawn(async move { service.run_with_progress(progress.as_ref()).await });
        }
        info!("Fleet running {} replicas", replicas.len());

        let closer = {
            let substrate = self.substrate.clone();
            let token = token.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                info!("Fleet cancelled, closing substrate");
                substrate.close().await;
            })
        };
        let result = Self::collect(&mut tasks, replicas.len()).await;
        closer.abort();
        if token.is_cancelled() {
            self.substrate.close().await;
        }
        result
    }

    async fn collect(
        tasks: &mut JoinSet<Result<ReplicaReport, ReplicaServiceError>>,
        expected: usize,
    ) -> Result<Vec<ReplicaReport>, FleetError> {
        let mut reports = Vec::with_capacity(expected);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report?),
                Err(e) => {
                    warn!("Replica task ended abnormally: {}", e);
                    return Err(FleetError::Join(e.to_string()));
                }
            }
        }
        reports.sort_by_key(|r| r.replica);
        Ok(reports)
    }
}
