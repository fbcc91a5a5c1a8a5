//! Call-data encoding.
//!
//! Calls are encoded as a 4-byte selector followed by 32-byte big-endian
//! words. The selector is the first four bytes of the SHA-256 of the function
//! signature, which is the convention the ledger gateway decodes.
//!
//! A MultiSend batch packs each call as
//! `operation (1) ‖ to (20) ‖ value (32) ‖ data length (32) ‖ data`
//! and wraps the packed bytes as a single dynamic `bytes` argument.

use crate::core::error::DomainError;
use crate::core::hash::{Address, Digest};
use serde::{Deserialize, Serialize};

pub const RESOLVE_BET_SIGNATURE: &str = "resolveBet(uint256,uint8,bytes32)";
pub const MULTI_SEND_SIGNATURE: &str = "multiSend(bytes)";

const WORD: usize = 32;
const PACKED_HEADER: usize = 1 + 20 + WORD + WORD;

/// How the multisig executes a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOperation {
    Call,
    DelegateCall,
}

impl CallOperation {
    pub fn code(&self) -> u8 {
        match self {
            CallOperation::Call => 0,
            CallOperation::DelegateCall => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CallOperation::Call),
            1 => Some(CallOperation::DelegateCall),
            _ => None,
        }
    }
}

/// One call inside a MultiSend batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSendCall {
    pub operation: CallOperation,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

impl MultiSendCall {
    pub fn call(to: Address, value: u128, data: Vec<u8>) -> Self {
        Self {
            operation: CallOperation::Call,
            to,
            value,
            data,
        }
    }

    /// Plain value transfer with empty call data
    pub fn transfer(to: Address, value: u128) -> Self {
        Self::call(to, value, Vec::new())
    }
}

pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Digest::of(&[signature.as_bytes()]);
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest.as_bytes()[..4]);
    out
}

fn word_u128(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn read_word_u128(word: &[u8]) -> Result<u128, DomainError> {
    if word.len() != WORD || word[..16].iter().any(|b| *b != 0) {
        return Err(DomainError::MalformedCallData(
            "word does not fit in 128 bits".to_string(),
        ));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(bytes))
}

/// Arguments of a `resolveBet` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveBet {
    pub bet_id: u64,
    pub result: u8,
    /// Content hash of the bet details
    pub details: Digest,
}

/// `resolveBet(bet_id, result, details)`
pub fn encode_resolve_bet(bet_id: u64, result: u8, details: &Digest) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 3 * WORD);
    data.extend_from_slice(&selector(RESOLVE_BET_SIGNATURE));
    data.extend_from_slice(&word_u128(u128::from(bet_id)));
    data.extend_from_slice(&word_u128(u128::from(result)));
    data.extend_from_slice(details.as_bytes());
    data
}

pub fn decode_resolve_bet(data: &[u8]) -> Result<ResolveBet, DomainError> {
    if data.len() != 4 + 3 * WORD || data[..4] != selector(RESOLVE_BET_SIGNATURE) {
        return Err(DomainError::MalformedCallData(
            "not a resolveBet call".to_string(),
        ));
    }
    let bet_id = u64::try_from(read_word_u128(&data[4..4 + WORD])?)
        .map_err(|_| DomainError::MalformedCallData("bet id overflow".to_string()))?;
    let result = u8::try_from(read_word_u128(&data[4 + WORD..4 + 2 * WORD])?)
        .map_err(|_| DomainError::MalformedCallData("result overflow".to_string()))?;
    let mut details = [0u8; WORD];
    details.copy_from_slice(&data[4 + 2 * WORD..]);
    Ok(ResolveBet {
        bet_id,
        result,
        details: Digest::from_bytes(details),
    })
}

/// `multiSend(bytes)` over the packed batch
pub fn encode_multi_send(calls: &[MultiSendCall]) -> Vec<u8> {
    let mut packed = Vec::new();
    for call in calls {
        packed.push(call.operation.code());
        packed.extend_from_slice(call.to.as_bytes());
        packed.extend_from_slice(&word_u128(call.value));
        packed.extend_from_slice(&word_u128(call.data.len() as u128));
        packed.extend_from_slice(&call.data);
    }

    let padding = (WORD - packed.len() % WORD) % WORD;
    let mut data = Vec::with_capacity(4 + 2 * WORD + packed.len() + padding);
    data.extend_from_slice(&selector(MULTI_SEND_SIGNATURE));
    data.extend_from_slice(&word_u128(WORD as u128));
    data.extend_from_slice(&word_u128(packed.len() as u128));
    data.extend_from_slice(&packed);
    data.extend(std::iter::repeat_n(0u8, padding));
    data
}

pub fn decode_multi_send(data: &[u8]) -> Result<Vec<MultiSendCall>, DomainError> {
    let malformed = |msg: &str| DomainError::MalformedCallData(msg.to_string());

    if data.len() < 4 + 2 * WORD || data[..4] != selector(MULTI_SEND_SIGNATURE) {
        return Err(malformed("not a multiSend call"));
    }
    let length = usize::try_from(read_word_u128(&data[4 + WORD..4 + 2 * WORD])?)
        .map_err(|_| malformed("length overflow"))?;
    let end = (4 + 2 * WORD)
        .checked_add(length)
        .ok_or_else(|| malformed("length overflow"))?;
    let packed = data
        .get(4 + 2 * WORD..end)
        .ok_or_else(|| malformed("truncated batch"))?;

    let mut calls = Vec::new();
    let mut cursor = 0;
    while cursor < packed.len() {
        let header = cursor
            .checked_add(PACKED_HEADER)
            .and_then(|end| packed.get(cursor..end))
            .ok_or_else(|| malformed("truncated call header"))?;
        let operation =
            CallOperation::from_code(header[0]).ok_or_else(|| malformed("unknown operation"))?;
        let mut to = [0u8; 20];
        to.copy_from_slice(&header[1..21]);
        let value = read_word_u128(&header[21..21 + WORD])?;
        let data_len = usize::try_from(read_word_u128(&header[21 + WORD..])?)
            .map_err(|_| malformed("data length overflow"))?;
        cursor += PACKED_HEADER;
        let end = cursor
            .checked_add(data_len)
            .ok_or_else(|| malformed("data length overflow"))?;
        let call_data = packed
            .get(cursor..end)
            .ok_or_else(|| malformed("truncated call data"))?;
        cursor = end;

        calls.push(MultiSendCall {
            operation,
            to: Address::from_bytes(to),
            value,
            data: call_data.to_vec(),
        });
    }
    Ok(calls)
}
