//! Data model for transfer records and the blocks that seal them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::LedgerError;

/// Back-link carried by the genesis block in place of a predecessor digest.
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A single transfer waiting to be sealed into a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub sender: String,
    pub recipient: String,
    /// Opaque reference to externally hashed content (usually a SHA-256 hex).
    #[serde(alias = "doc_hash")]
    pub content_hash: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Record {
    /// Build a record, rejecting blank identities or content references.
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content_hash: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, LedgerError> {
        let record = Record {
            sender: sender.into(),
            recipient: recipient.into(),
            content_hash: content_hash.into(),
            description,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the required fields. Records arriving through serde go through here too.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let required = [
            ("sender", &self.sender),
            ("recipient", &self.recipient),
            ("content_hash", &self.content_hash),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(LedgerError::InvalidRecord { field });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// 1-indexed position in the chain.
    pub index: u64,
    /// Creation instant (UTC). Advisory only, never used for ordering.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Sealed records in arrival order.
    pub records: Vec<Record>,
    /// Digest of the previous block, or [`GENESIS_PREVIOUS_HASH`].
    pub previous_hash: String,
}

impl Block {
    pub fn genesis() -> Self {
        Block {
            index: 1,
            timestamp: OffsetDateTime::now_utc(),
            records: Vec::new(),
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }
}
