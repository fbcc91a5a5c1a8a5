//! In-process multisig ledger.
//!
//! Rules enforced on `submit`, in order:
//!
//! 1. the payload targets this Safe
//! 2. a nonce that already executed resolves to the existing transaction
//! 3. a nonce below the next expected one is rejected
//! 4. at least `threshold` distinct owners signed the payload hash
//! 5. the MultiSend batch executes atomically; a failing call reverts the
//!    whole batch but still consumes the nonce

use crate::signer::verify;
use async_trait::async_trait;
use chainbet_application::{Confirmation, LedgerError, LedgerGateway, SubmitOutcome};
use chainbet_domain::payload::encoding::{ResolveBet, decode_multi_send, decode_resolve_bet};
use chainbet_domain::{
    Address, Bet, CallOperation, Chain, Digest, MultiSendCall, PayloadHash, ReplicaId,
    SignedPayload, TransactionPayload, TxHash, Verdict, signing_bytes,
};
use ed25519_dalek::VerifyingKey;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

const TX_DOMAIN: &[u8] = b"chainbet/tx/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Executed,
    Reverted,
}

/// A transaction the ledger accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransaction {
    pub tx_hash: TxHash,
    pub payload_hash: PayloadHash,
    pub nonce: u64,
    pub block: u64,
    pub status: TransactionStatus,
    pub revert_reason: Option<String>,
}

#[derive(Debug, Clone)]
struct PlacedBet {
    bet: Bet,
    result: Option<u8>,
    details: Option<Digest>,
}

/// Balances and bets a batch may modify; cloned so a batch applies atomically
#[derive(Debug, Clone, Default)]
struct Contracts {
    pool: u128,
    bets: Vec<PlacedBet>,
    resolved: u64,
    balances: BTreeMap<Address, u128>,
}

impl Contracts {
    fn pending_bet(&self) -> Option<&Bet> {
        let next = self.resolved as usize;
        self.bets.get(next).map(|placed| &placed.bet)
    }

    fn resolve(&mut self, resolution: ResolveBet) -> Result<(), String> {
        let ResolveBet {
            bet_id,
            result,
            details,
        } = resolution;
        let expected = self.resolved + 1;
        if bet_id != expected {
            return Err(format!(
                "resolveBet({}): next pending bet is {}",
                bet_id, expected
            ));
        }
        if result > Verdict::Void.resolution_code() {
            return Err(format!("resolveBet({}): unknown result {}", bet_id, result));
        }
        let placed = self
            .bets
            .get_mut(self.resolved as usize)
            .ok_or_else(|| format!("resolveBet({}): no such bet", bet_id))?;
        placed.result = Some(result);
        placed.details = Some(details);
        self.resolved += 1;
        Ok(())
    }

    fn transfer(&mut self, to: Address, value: u128) -> Result<(), String> {
        if value > self.pool {
            return Err(format!(
                "transfer of {} exceeds pool balance {}",
                value, self.pool
            ));
        }
        self.pool -= value;
        *self.balances.entry(to).or_default() += value;
        Ok(())
    }
}

struct LedgerState {
    contracts: Contracts,
    next_nonce: u64,
    transactions: BTreeMap<u64, LedgerTransaction>,
    block: u64,
    polls: BTreeMap<TxHash, u32>,
    failing_submits: u32,
    lost_receipts: u32,
    submit_calls: usize,
}

pub struct InMemoryLedger {
    safe: Address,
    betting_contract: Address,
    multisend: Address,
    threshold: usize,
    owners: BTreeMap<ReplicaId, VerifyingKey>,
    finality_polls: u32,
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(safe: Address, betting_contract: Address, multisend: Address, threshold: usize) -> Self {
        Self {
            safe,
            betting_contract,
            multisend,
            threshold,
            owners: BTreeMap::new(),
            finality_polls: 0,
            state: Mutex::new(LedgerState {
                contracts: Contracts::default(),
                next_nonce: 0,
                transactions: BTreeMap::new(),
                block: 0,
                polls: BTreeMap::new(),
                failing_submits: 0,
                lost_receipts: 0,
                submit_calls: 0,
            }),
        }
    }

    /// Register a Safe owner
    pub fn with_owner(mut self, replica: ReplicaId, key: VerifyingKey) -> Self {
        self.owners.insert(replica, key);
        self
    }

    pub fn with_starting_nonce(self, nonce: u64) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.next_nonce = nonce;
        }
        self
    }

    pub fn with_pool(self, pool: u128) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.contracts.pool = pool;
        }
        self
    }

    /// Polls a transaction stays pending before it is final
    pub fn with_finality_polls(mut self, polls: u32) -> Self {
        self.finality_polls = polls;
        self
    }

    /// Place a bet on the betting contract and return its id
    pub fn place_bet(&self, choice: Chain, stake: u128, bettor: Address) -> u64 {
        let Ok(mut state) = self.state.lock() else {
            return 0;
        };
        let id = state.contracts.bets.len() as u64 + 1;
        state.contracts.bets.push(PlacedBet {
            bet: Bet {
                id,
                choice,
                stake,
                bettor,
            },
            result: None,
            details: None,
        });
        id
    }

    /// The next `count` submissions fail with a transient error before reaching the Safe
    pub fn fail_next_submits(&self, count: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_submits = count;
        }
    }

    /// The next `count` submissions execute but their response is lost
    pub fn lose_next_receipts(&self, count: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.lost_receipts = count;
        }
    }

    pub fn transactions(&self) -> Vec<LedgerTransaction> {
        self.state
            .lock()
            .map(|s| s.transactions.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn transaction_count(&self) -> usize {
        self.state.lock().map(|s| s.transactions.len()).unwrap_or(0)
    }

    pub fn submit_calls(&self) -> usize {
        self.state.lock().map(|s| s.submit_calls).unwrap_or(0)
    }

    pub fn balance_of(&self, address: &Address) -> u128 {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.contracts.balances.get(address).copied())
            .unwrap_or(0)
    }

    pub fn pool(&self) -> u128 {
        self.state.lock().map(|s| s.contracts.pool).unwrap_or(0)
    }

    /// Result code a bet was resolved with
    pub fn bet_result(&self, bet_id: u64) -> Option<u8> {
        let state = self.state.lock().ok()?;
        let index = usize::try_from(bet_id.checked_sub(1)?).ok()?;
        state.contracts.bets.get(index)?.result
    }

    /// Bet-details hash a bet was resolved with
    pub fn bet_details(&self, bet_id: u64) -> Option<Digest> {
        let state = self.state.lock().ok()?;
        let index = usize::try_from(bet_id.checked_sub(1)?).ok()?;
        state.contracts.bets.get(index)?.details
    }

    fn state(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Permanent("ledger state poisoned".to_string()))
    }

    fn tx_hash(payload: &TransactionPayload) -> TxHash {
        Digest::of(&[TX_DOMAIN, payload.hash().as_bytes()])
    }

    fn valid_signers(&self, payload: &TransactionPayload, signed: &SignedPayload) -> usize {
        let message = signing_bytes(payload.round, &payload.hash());
        signed
            .signatures
            .iter()
            .filter(|share| {
                self.owners
                    .get(&share.replica)
                    .is_some_and(|key| verify(key, &message, &share.signature))
            })
            .map(|share| share.replica)
            .collect::<BTreeSet<_>>()
            .len()
    }

    fn decode_batch(&self, payload: &TransactionPayload) -> Result<Vec<MultiSendCall>, String> {
        if payload.target != self.multisend || payload.operation != CallOperation::DelegateCall {
            return Err(format!(
                "unsupported call to {} ({:?})",
                payload.target, payload.operation
            ));
        }
        decode_multi_send(&payload.call_data).map_err(|e| e.to_string())
    }

    fn execute(&self, contracts: &Contracts, calls: &[MultiSendCall]) -> Result<Contracts, String> {
        let mut next = contracts.clone();
        for call in calls {
            if call.to == self.betting_contract {
                next.resolve(decode_resolve_bet(&call.data).map_err(|e| e.to_string())?)?;
            } else if call.data.is_empty() {
                next.transfer(call.to, call.value)?;
            } else {
                return Err(format!("call to unknown contract {}", call.to));
            }
        }
        Ok(next)
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn pending_bet(&self) -> Result<Option<Bet>, LedgerError> {
        Ok(self.state()?.contracts.pending_bet().cloned())
    }

    async fn pool_balance(&self) -> Result<u128, LedgerError> {
        Ok(self.state()?.contracts.pool)
    }

    async fn submit(
        &self,
        payload: &TransactionPayload,
        signed: &SignedPayload,
    ) -> Result<SubmitOutcome, LedgerError> {
        let mut state = self.state()?;
        state.submit_calls += 1;

        if state.failing_submits > 0 {
            state.failing_submits -= 1;
            return Err(LedgerError::Transient("connection refused".to_string()));
        }

        if payload.safe != self.safe {
            return Err(LedgerError::Permanent(format!(
                "payload is for Safe {}, not {}",
                payload.safe, self.safe
            )));
        }

        if let Some(existing) = state.transactions.get(&payload.nonce) {
            let same = existing.payload_hash == payload.hash();
            debug!(
                "nonce {} already executed ({})",
                payload.nonce,
                if same { "same payload" } else { "other payload" }
            );
            return Ok(SubmitOutcome::AlreadyResolved {
                tx_hash: same.then_some(existing.tx_hash),
            });
        }
        if payload.nonce < state.next_nonce {
            return Err(LedgerError::Permanent(format!(
                "nonce {} is below the Safe nonce {}",
                payload.nonce, state.next_nonce
            )));
        }

        if !signed.covers(payload) {
            return Err(LedgerError::Permanent(
                "signatures do not cover the payload".to_string(),
            ));
        }
        let signers = self.valid_signers(payload, signed);
        if signers < self.threshold {
            return Err(LedgerError::Permanent(format!(
                "{} valid owner signatures, threshold is {}",
                signers, self.threshold
            )));
        }

        let outcome = self
            .decode_batch(payload)
            .and_then(|calls| self.execute(&state.contracts, &calls));

        state.block += 1;
        let tx_hash = Self::tx_hash(payload);
        let transaction = match outcome {
            Ok(next) => {
                state.contracts = next;
                info!("nonce {} executed as {}", payload.nonce, tx_hash.short());
                LedgerTransaction {
                    tx_hash,
                    payload_hash: payload.hash(),
                    nonce: payload.nonce,
                    block: state.block,
                    status: TransactionStatus::Executed,
                    revert_reason: None,
                }
            }
            Err(reason) => {
                warn!("nonce {} reverted: {}", payload.nonce, reason);
                LedgerTransaction {
                    tx_hash,
                    payload_hash: payload.hash(),
                    nonce: payload.nonce,
                    block: state.block,
                    status: TransactionStatus::Reverted,
                    revert_reason: Some(reason),
                }
            }
        };
        state.transactions.insert(payload.nonce, transaction);
        state.next_nonce = payload.nonce + 1;

        if state.lost_receipts > 0 {
            state.lost_receipts -= 1;
            return Err(LedgerError::Transient("connection reset".to_string()));
        }
        Ok(SubmitOutcome::Accepted { tx_hash })
    }

    async fn confirmation(&self, tx_hash: &TxHash) -> Result<Confirmation, LedgerError> {
        let finality_polls = self.finality_polls;
        let mut state = self.state()?;
        let transaction = state
            .transactions
            .values()
            .find(|tx| tx.tx_hash == *tx_hash)
            .cloned()
            .ok_or_else(|| LedgerError::Permanent(format!("unknown transaction {}", tx_hash)))?;

        let polls = state.polls.entry(*tx_hash).or_default();
        if *polls < finality_polls {
            *polls += 1;
            return Ok(Confirmation::Pending);
        }

        Ok(match transaction.status {
            TransactionStatus::Executed => Confirmation::Final {
                block: transaction.block,
            },
            TransactionStatus::Reverted => Confirmation::Reverted {
                reason: transaction
                    .revert_reason
                    .unwrap_or_else(|| "execution reverted".to_string()),
            },
        })
    }
}
