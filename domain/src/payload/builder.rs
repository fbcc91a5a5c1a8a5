//! Deterministic payload construction

use super::encoding::{CallOperation, MultiSendCall, encode_multi_send, encode_resolve_bet};
use super::entities::{PayloadContext, TransactionPayload};
use crate::core::ids::RoundIndex;
use crate::decision::Decision;

/// Build the settlement transaction for a decision.
///
/// The Safe delegate-calls MultiSend with a batch of `resolveBet` on the
/// betting contract followed, when there is a prize, by a transfer to the
/// beneficiary. The resolution carries [`Decision::details_digest`].
/// Returns `None` when there is no bet to settle.
pub fn build_payload(
    decision: &Decision,
    round: RoundIndex,
    context: &PayloadContext,
) -> Option<TransactionPayload> {
    let bet_id = decision.bet_id?;

    let mut calls = vec![MultiSendCall::call(
        context.betting_contract,
        0,
        encode_resolve_bet(
            bet_id,
            decision.verdict.resolution_code(),
            &decision.details_digest(),
        ),
    )];
    if decision.pays_out()
        && let Some(beneficiary) = decision.beneficiary
    {
        calls.push(MultiSendCall::transfer(beneficiary, decision.prize_amount));
    }

    Some(TransactionPayload {
        round,
        safe: context.safe,
        target: context.multisend,
        value: 0,
        operation: CallOperation::DelegateCall,
        call_data: encode_multi_send(&calls),
        nonce: context.starting_nonce.saturating_add(round.0),
        signature_threshold: context.signature_threshold,
    })
}
