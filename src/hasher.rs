//! Canonical block serialization and SHA-256 digests.
//!
//! The byte encoding is a compact JSON object with lexicographically sorted
//! keys (serde_json's default `Map` is ordered), so the same field values
//! always produce the same bytes. Record order inside a block is kept as-is:
//! it is part of the block's meaning.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::model::{Block, Record};

/// SHA-256 over the concatenated parts, lowercase hex.
pub fn hash_concat(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p);
    }
    hex::encode(hasher.finalize())
}

/// Digest of a block, used as its identity and as the next block's back-link.
pub fn hash_block(block: &Block) -> String {
    hash_concat(&[&canonical_bytes(block)])
}

/// Canonical byte serialization of every logical field of `block`.
pub fn canonical_bytes(block: &Block) -> Vec<u8> {
    canonical_value(block).to_string().into_bytes()
}

fn canonical_value(block: &Block) -> Value {
    json!({
        "index": block.index,
        "previous_hash": block.previous_hash,
        "records": block.records.iter().map(record_value).collect::<Vec<_>>(),
        "timestamp": canonical_timestamp(block.timestamp),
    })
}

fn record_value(record: &Record) -> Value {
    json!({
        "content_hash": record.content_hash,
        "description": record.description,
        "recipient": record.recipient,
        "sender": record.sender,
    })
}

/// Fixed-width UTC rendering: `YYYY-MM-DDTHH:MM:SS.nnnnnnnnnZ`.
fn canonical_timestamp(ts: OffsetDateTime) -> String {
    ts.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
        ))
        // Numeric components only.
        .expect("canonical timestamp format")
}
