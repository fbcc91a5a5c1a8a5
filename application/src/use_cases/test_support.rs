//! In-memory test doubles shared by the use case tests.

use crate::ports::journal::{JournalError, Reservation, SignatureJournal, SubmissionLog};
use crate::ports::ledger::{Confirmation, LedgerError, LedgerGateway, SubmitOutcome};
use crate::ports::oracle::{HolderCount, HolderCountSource, OracleError};
use crate::ports::signer::{Signer, SignerError};
use crate::ports::substrate::{ConsensusSubstrate, SubstrateError};
use async_trait::async_trait;
use chainbet_domain::{
    Address, Agreement, AgreementParams, Bet, Chain, ConsensusPhase, Decision, Digest,
    PayloadContext, PayloadHash, Proposal, ReplicaId, RoundIndex, SignedPayload,
    SubmissionRecord, TransactionPayload, TxHash, Verdict, resolve_agreement,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::Notify;

pub(crate) fn context(threshold: usize) -> PayloadContext {
    PayloadContext {
        safe: Address::from_bytes([0x5a; 20]),
        betting_contract: Address::from_bytes([0xbe; 20]),
        multisend: Address::from_bytes([0x3d; 20]),
        starting_nonce: 10,
        signature_threshold: threshold,
    }
}

pub(crate) fn bettor() -> Address {
    Address::from_bytes([0xab; 20])
}

pub(crate) fn settled_decision() -> Decision {
    Decision {
        winning_chain: Some(Chain::Base),
        holder_difference: 200,
        verdict: Verdict::Won,
        prize_amount: 2_000,
        beneficiary: Some(bettor()),
        bet_id: Some(1),
    }
}

// ==================== Oracle ====================

pub(crate) struct FixedOracle {
    pub arbitrum: u64,
    pub base: u64,
}

#[async_trait]
impl HolderCountSource for FixedOracle {
    async fn holder_count(&self, chain: Chain) -> Result<HolderCount, OracleError> {
        let count = match chain {
            Chain::Arbitrum => self.arbitrum,
            Chain::Base => self.base,
        };
        Ok(HolderCount {
            count,
            as_of: Utc::now(),
        })
    }
}

// ==================== Ledger ====================

#[derive(Default)]
struct LedgerState {
    bet: Option<Bet>,
    pool: u128,
    by_nonce: HashMap<u64, TxHash>,
    submit_failures: VecDeque<LedgerError>,
    pending_confirmations: u32,
    submit_calls: usize,
}

/// Ledger that deduplicates by nonce and finalizes every transaction
#[derive(Default)]
pub(crate) struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bet(self, bet: Bet) -> Self {
        self.state.lock().unwrap().bet = Some(bet);
        self
    }

    pub fn with_pool(self, pool: u128) -> Self {
        self.state.lock().unwrap().pool = pool;
        self
    }

    pub fn failing_submit(self, error: LedgerError) -> Self {
        self.state.lock().unwrap().submit_failures.push_back(error);
        self
    }

    pub fn pending_confirmations(self, polls: u32) -> Self {
        self.state.lock().unwrap().pending_confirmations = polls;
        self
    }

    /// Land a transaction directly, as another replica would
    pub fn force_submit(&self, payload: &TransactionPayload) -> TxHash {
        let tx_hash = Digest::of(&[b"tx", payload.hash().as_bytes()]);
        self.state
            .lock()
            .unwrap()
            .by_nonce
            .insert(payload.nonce, tx_hash);
        tx_hash
    }

    pub fn submit_calls(&self) -> usize {
        self.state.lock().unwrap().submit_calls
    }

    pub fn transaction_count(&self) -> usize {
        self.state.lock().unwrap().by_nonce.len()
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn pending_bet(&self) -> Result<Option<Bet>, LedgerError> {
        Ok(self.state.lock().unwrap().bet.clone())
    }

    async fn pool_balance(&self) -> Result<u128, LedgerError> {
        Ok(self.state.lock().unwrap().pool)
    }

    async fn submit(
        &self,
        payload: &TransactionPayload,
        _signed: &SignedPayload,
    ) -> Result<SubmitOutcome, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.submit_calls += 1;
        if let Some(error) = state.submit_failures.pop_front() {
            return Err(error);
        }
        if let Some(existing) = state.by_nonce.get(&payload.nonce) {
            return Ok(SubmitOutcome::AlreadyResolved {
                tx_hash: Some(*existing),
            });
        }
        let tx_hash = Digest::of(&[b"tx", payload.hash().as_bytes()]);
        state.by_nonce.insert(payload.nonce, tx_hash);
        Ok(SubmitOutcome::Accepted { tx_hash })
    }

    async fn confirmation(&self, _tx_hash: &TxHash) -> Result<Confirmation, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.pending_confirmations > 0 {
            state.pending_confirmations -= 1;
            return Ok(Confirmation::Pending);
        }
        Ok(Confirmation::Final { block: 42 })
    }
}

// ==================== Signer ====================

pub(crate) struct MockSigner {
    replica: ReplicaId,
}

impl MockSigner {
    pub fn new(replica: ReplicaId) -> Self {
        Self { replica }
    }
}

#[async_trait]
impl Signer for MockSigner {
    fn replica(&self) -> ReplicaId {
        self.replica
    }

    fn public_key(&self) -> Vec<u8> {
        self.replica.0.to_be_bytes().to_vec()
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        Ok(Digest::of(&[&self.replica.0.to_be_bytes(), message])
            .as_bytes()
            .to_vec())
    }
}

// ==================== Journals ====================

#[derive(Default)]
pub(crate) struct MemorySubmissionLog {
    records: Mutex<Vec<SubmissionRecord>>,
    /// Appends accepted before the disk "fills up"
    capacity: Option<usize>,
}

impl MemorySubmissionLog {
    pub fn full_after(appends: usize) -> Self {
        Self {
            capacity: Some(appends),
            ..Self::default()
        }
    }
}

impl SubmissionLog for MemorySubmissionLog {
    fn append(&self, record: &SubmissionRecord) -> Result<(), JournalError> {
        let mut records = self.records.lock().unwrap();
        if self.capacity.is_some_and(|capacity| records.len() >= capacity) {
            return Err(JournalError::Io("no space left on device".to_string()));
        }
        records.push(record.clone());
        Ok(())
    }

    fn records(&self) -> Result<Vec<SubmissionRecord>, JournalError> {
        Ok(self.records.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub(crate) struct MemoryJournal {
    signed: Mutex<BTreeMap<RoundIndex, PayloadHash>>,
}

impl SignatureJournal for MemoryJournal {
    fn reserve(
        &self,
        round: RoundIndex,
        payload_hash: PayloadHash,
    ) -> Result<Reservation, JournalError> {
        let mut signed = self.signed.lock().unwrap();
        Ok(match signed.get(&round).copied() {
            None => {
                signed.insert(round, payload_hash);
                Reservation::Fresh
            }
            Some(existing) if existing == payload_hash => Reservation::Repeat,
            Some(existing) => Reservation::Conflict { signed: existing },
        })
    }

    fn last_signed_round(&self) -> Result<Option<RoundIndex>, JournalError> {
        Ok(self.signed.lock().unwrap().keys().next_back().copied())
    }
}

// ==================== Substrate ====================

#[derive(Default)]
struct Slots {
    proposals: BTreeMap<(RoundIndex, ConsensusPhase), BTreeMap<ReplicaId, Proposal>>,
    agreed: BTreeMap<(RoundIndex, ConsensusPhase), Agreement>,
}

/// Single-process substrate resolving each slot with `resolve_agreement`
pub(crate) struct TestSubstrate {
    params: AgreementParams,
    slots: Mutex<Slots>,
    notify: Notify,
}

impl TestSubstrate {
    pub fn new(params: AgreementParams) -> Self {
        Self {
            params,
            slots: Mutex::new(Slots::default()),
            notify: Notify::new(),
        }
    }

    pub fn proposal_count(&self, round: RoundIndex, phase: ConsensusPhase) -> usize {
        self.slots
            .lock()
            .unwrap()
            .proposals
            .get(&(round, phase))
            .map_or(0, |p| p.len())
    }
}

#[async_trait]
impl ConsensusSubstrate for TestSubstrate {
    async fn propose(
        &self,
        replica: ReplicaId,
        round: RoundIndex,
        proposal: Proposal,
    ) -> Result<(), SubstrateError> {
        let phase = proposal.phase();
        {
            let mut guard = self.slots.lock().unwrap();
            let slots = &mut *guard;
            if slots.agreed.contains_key(&(round, phase)) {
                return Ok(());
            }
            let proposals = slots.proposals.entry((round, phase)).or_default();
            proposals.entry(replica).or_insert(proposal);
            if let Some(agreement) = resolve_agreement(round, phase, proposals, &self.params) {
                slots.agreed.insert((round, phase), agreement);
            }
        }
        self.notify.notify_waiters();
        Ok(())
    }

    async fn agreed(
        &self,
        round: RoundIndex,
        phase: ConsensusPhase,
    ) -> Result<Option<Agreement>, SubstrateError> {
        Ok(self.slots.lock().unwrap().agreed.get(&(round, phase)).cloned())
    }

    async fn wait_agreed(
        &self,
        round: RoundIndex,
        phase: ConsensusPhase,
    ) -> Result<Agreement, SubstrateError> {
        loop {
            let notified = self.notify.notified();
            if let Some(agreement) = self.agreed(round, phase).await? {
                return Ok(agreement);
            }
            notified.await;
        }
    }
}
