//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (amounts are integer cents rendered as two-decimal text)
//!
//! Content hashes and all three signatures are computed over these exact
//! bytes. Any re-encoding that is not byte-identical would make honest data
//! fail verification, so decoding rejects input that does not re-encode to
//! itself.

use ciborium::value::{Integer, Value};

use crate::block::Block;
use crate::crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature};
use crate::error::CoreError;
use crate::transaction::TransactionRecord;
use crate::types::{Amount, BillingDate};

/// The fixed, publicly known zero-representation hashed by the genesis block.
pub const GENESIS_ZERO: [u8; 32] = [0u8; 32];

/// Transaction field keys (integer keys for compact encoding).
///
/// Keys 0-3 form the payload both parties sign; 4-5 are the signatures;
/// 6 is the block sequence number mixed into the content hash.
mod tx_keys {
    pub const PATIENT: u64 = 0;
    pub const AUTHORITY: u64 = 1;
    pub const DATE: u64 = 2;
    pub const AMOUNT: u64 = 3;
    pub const PATIENT_SIGNATURE: u64 = 4;
    pub const AUTHORITY_SIGNATURE: u64 = 5;
    pub const SEQ: u64 = 6;
}

/// Persisted block field keys.
mod block_keys {
    pub const SEQ: u64 = 0;
    pub const CONTENT_HASH: u64 = 1;
    pub const PREVIOUS_HASH: u64 = 2;
    pub const MINER_SIGNATURE: u64 = 3;
    pub const MINER: u64 = 4;
    pub const TRANSACTION: u64 = 5;
}

/// Encode the payload both parties sign:
/// `{0: patient, 1: authority, 2: date, 3: amount}`.
pub fn transaction_payload(
    patient: &Ed25519PublicKey,
    authority: &Ed25519PublicKey,
    date: &BillingDate,
    amount: &Amount,
) -> Vec<u8> {
    let value = Value::Map(payload_entries(patient, authority, date, amount));
    encode_cbor_value_canonical(&value)
}

/// Construct the message the authority signs (payload || patient signature).
pub fn authority_message(payload: &[u8], patient_signature: &Ed25519Signature) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 64);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&patient_signature.0);
    buf
}

/// Encode the data bound by a block's content hash: every transaction field,
/// both signatures, and the sequence number.
pub fn block_content_bytes(transaction: &TransactionRecord, seq: u64) -> Vec<u8> {
    let mut entries = transaction_entries(transaction);
    entries.push((uint(tx_keys::SEQ), uint(seq)));
    encode_cbor_value_canonical(&Value::Map(entries))
}

/// Construct the miner's linkage message:
/// `authority_signature (64) || seq (u64 BE) || previous_hash (32)`.
///
/// Every component is fixed-width, so plain concatenation is unambiguous.
pub fn miner_message(
    authority_signature: &Ed25519Signature,
    seq: u64,
    previous_hash: &Blake3Hash,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64 + 8 + 32);
    buf.extend_from_slice(&authority_signature.0);
    buf.extend_from_slice(&seq.to_be_bytes());
    buf.extend_from_slice(&previous_hash.0);
    buf
}

/// Encode a full block (including its transaction) to canonical bytes.
///
/// Format: `{0: seq, 1: content_hash, 2: previous_hash, 3: miner_signature,
/// 4: miner, 5: transaction | null}`.
pub fn encode_block(block: &Block) -> Vec<u8> {
    let transaction = match &block.transaction {
        Some(tx) => Value::Map(transaction_entries(tx)),
        None => Value::Null,
    };

    let entries = vec![
        (uint(block_keys::SEQ), uint(block.seq)),
        (uint(block_keys::CONTENT_HASH), Value::Bytes(block.content_hash.0.to_vec())),
        (uint(block_keys::PREVIOUS_HASH), Value::Bytes(block.previous_hash.0.to_vec())),
        (uint(block_keys::MINER_SIGNATURE), Value::Bytes(block.miner_signature.0.to_vec())),
        (uint(block_keys::MINER), Value::Bytes(block.miner.0.to_vec())),
        (uint(block_keys::TRANSACTION), transaction),
    ];

    encode_cbor_value_canonical(&Value::Map(entries))
}

/// Decode a block from canonical bytes.
///
/// The input must be exactly the canonical encoding of the decoded block.
pub fn decode_block(bytes: &[u8]) -> Result<Block, CoreError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::Decoding(e.to_string()))?;

    let map = as_map(&value, "block")?;

    let transaction = match get(map, block_keys::TRANSACTION) {
        Some(Value::Null) | None => None,
        Some(tx) => Some(transaction_from_value(tx)?),
    };

    let block = Block {
        seq: uint_field(map, block_keys::SEQ, "seq")?,
        content_hash: Blake3Hash(bytes_field(map, block_keys::CONTENT_HASH, "content_hash")?),
        previous_hash: Blake3Hash(bytes_field(map, block_keys::PREVIOUS_HASH, "previous_hash")?),
        miner_signature: Ed25519Signature(bytes_field(
            map,
            block_keys::MINER_SIGNATURE,
            "miner_signature",
        )?),
        miner: Ed25519PublicKey(bytes_field(map, block_keys::MINER, "miner")?),
        transaction,
    };

    if encode_block(&block) != bytes {
        return Err(CoreError::Decoding("input is not canonically encoded".into()));
    }

    Ok(block)
}

fn payload_entries(
    patient: &Ed25519PublicKey,
    authority: &Ed25519PublicKey,
    date: &BillingDate,
    amount: &Amount,
) -> Vec<(Value, Value)> {
    vec![
        (uint(tx_keys::PATIENT), Value::Bytes(patient.0.to_vec())),
        (uint(tx_keys::AUTHORITY), Value::Bytes(authority.0.to_vec())),
        (uint(tx_keys::DATE), Value::Text(date.canonical())),
        (uint(tx_keys::AMOUNT), Value::Text(amount.canonical())),
    ]
}

fn transaction_entries(tx: &TransactionRecord) -> Vec<(Value, Value)> {
    let mut entries = payload_entries(&tx.patient, &tx.authority, &tx.date, &tx.amount);
    entries.push((
        uint(tx_keys::PATIENT_SIGNATURE),
        Value::Bytes(tx.patient_signature.0.to_vec()),
    ));
    entries.push((
        uint(tx_keys::AUTHORITY_SIGNATURE),
        Value::Bytes(tx.authority_signature.0.to_vec()),
    ));
    entries
}

fn transaction_from_value(value: &Value) -> Result<TransactionRecord, CoreError> {
    let map = as_map(value, "transaction")?;

    let date = BillingDate::parse(&text_field(map, tx_keys::DATE, "date")?)
        .map_err(|e| CoreError::Decoding(e.to_string()))?;
    let amount = Amount::parse(&text_field(map, tx_keys::AMOUNT, "amount")?)
        .map_err(|e| CoreError::Decoding(e.to_string()))?;

    Ok(TransactionRecord {
        patient: Ed25519PublicKey(bytes_field(map, tx_keys::PATIENT, "patient")?),
        authority: Ed25519PublicKey(bytes_field(map, tx_keys::AUTHORITY, "authority")?),
        date,
        amount,
        patient_signature: Ed25519Signature(bytes_field(
            map,
            tx_keys::PATIENT_SIGNATURE,
            "patient_signature",
        )?),
        authority_signature: Ed25519Signature(bytes_field(
            map,
            tx_keys::AUTHORITY_SIGNATURE,
            "authority_signature",
        )?),
    })
}

fn uint(n: u64) -> Value {
    Value::Integer(n.into())
}

fn as_map<'a>(value: &'a Value, what: &str) -> Result<&'a [(Value, Value)], CoreError> {
    match value {
        Value::Map(m) => Ok(m.as_slice()),
        _ => Err(CoreError::Decoding(format!("expected {what} map"))),
    }
}

fn get(map: &[(Value, Value)], key: u64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == i128::from(key)))
        .map(|(_, v)| v)
}

fn bytes_field<const N: usize>(
    map: &[(Value, Value)],
    key: u64,
    name: &str,
) -> Result<[u8; N], CoreError> {
    match get(map, key) {
        Some(Value::Bytes(b)) => b
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::Decoding(format!("{name}: expected {N} bytes, got {}", b.len()))),
        _ => Err(CoreError::Decoding(format!("missing or invalid {name}"))),
    }
}

fn text_field(map: &[(Value, Value)], key: u64, name: &str) -> Result<String, CoreError> {
    match get(map, key) {
        Some(Value::Text(s)) => Ok(s.clone()),
        _ => Err(CoreError::Decoding(format!("missing or invalid {name}"))),
    }
}

fn uint_field(map: &[(Value, Value)], key: u64, name: &str) -> Result<u64, CoreError> {
    match get(map, key) {
        Some(Value::Integer(i)) => {
            u64::try_from(*i).map_err(|_| CoreError::Decoding(format!("{name} out of range")))
        }
        _ => Err(CoreError::Decoding(format!("missing or invalid {name}"))),
    }
}

/// Encode a CBOR Value to canonical bytes.
///
/// This function ensures:
/// - Map keys are sorted by encoded byte comparison
/// - Integers use smallest encoding
/// - Definite lengths only
fn encode_cbor_value_canonical(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a CBOR value.
///
/// Only the value shapes built by this module occur here.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        _ => unreachable!("floats and tags are never part of a canonical ledger value"),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n = i128::from(i);

    if n >= 0 {
        // Major type 0: unsigned integer
        encode_uint(buf, 0, n as u64);
    } else {
        // Major type 1: negative integer, -1 encodes as 0
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);

    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}
