//! The ledger state machine: a hash-linked chain plus a pending-record buffer.

use time::OffsetDateTime;

use crate::error::LedgerError;
use crate::hasher::hash_block;
use crate::model::{Block, Record};

/// Append-only chain of blocks. Never empty: a genesis block is created on
/// construction and on [`Ledger::reset`].
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Record>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
        }
    }

    /// Index the next sealed block will receive.
    pub fn next_index(&self) -> u64 {
        (self.chain.len() as u64) + 1
    }

    /// Queue a record for the next seal. Returns the index of the block that
    /// will hold it if nothing else is sealed first.
    pub fn append_record(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content_hash: impl Into<String>,
        description: Option<String>,
    ) -> Result<u64, LedgerError> {
        let record = Record::new(sender, recipient, content_hash, description)?;
        self.push_record(record)
    }

    /// Queue an already-built record, re-checking its required fields.
    pub fn push_record(&mut self, record: Record) -> Result<u64, LedgerError> {
        record.validate()?;
        tracing::debug!(
            sender = %record.sender,
            recipient = %record.recipient,
            pending = self.pending.len() + 1,
            "record queued"
        );
        self.pending.push(record);
        Ok(self.next_index())
    }

    /// Seal all pending records into a new block and append it.
    ///
    /// `previous_hash` overrides the back-link. It is not checked against the
    /// real digest of the last block; a mismatching override produces a chain
    /// that fails [`Ledger::verify`].
    pub fn seal_block(&mut self, previous_hash: Option<String>) -> Block {
        let computed = hash_block(self.last_block());
        let previous_hash = match previous_hash {
            Some(given) => {
                if given != computed {
                    tracing::warn!(
                        given = %given,
                        computed = %computed,
                        "sealing with a back-link that does not match the last block"
                    );
                }
                given
            }
            None => computed,
        };

        let block = Block {
            index: self.next_index(),
            timestamp: OffsetDateTime::now_utc(),
            records: std::mem::take(&mut self.pending),
            previous_hash,
        };
        tracing::info!(
            index = block.index,
            records = block.records.len(),
            "block sealed"
        );
        self.chain.push(block.clone());
        block
    }

    /// Records of the block at 1-based `index`.
    pub fn fetch_records(&self, index: u64) -> Result<&[Record], LedgerError> {
        self.block(index).map(|b| b.records.as_slice())
    }

    /// Block at 1-based `index`.
    pub fn block(&self, index: u64) -> Result<&Block, LedgerError> {
        index
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.chain.get(i))
            .ok_or(LedgerError::IndexOutOfRange {
                index,
                len: self.chain.len(),
            })
    }

    /// Drop every block and pending record, then start over from genesis.
    pub fn reset(&mut self) {
        tracing::info!(
            blocks = self.chain.len(),
            pending = self.pending.len(),
            "ledger reset"
        );
        self.chain.clear();
        self.pending.clear();
        self.chain.push(Block::genesis());
    }

    pub fn verify(&self) -> bool {
        verify_chain(&self.chain)
    }

    pub fn last_block(&self) -> &Block {
        // Non-empty by construction.
        &self.chain[self.chain.len() - 1]
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Record] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk the chain and check every back-link against the recomputed digest of
/// its predecessor. Stops at the first mismatch.
pub fn verify_chain(chain: &[Block]) -> bool {
    for pair in chain.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        if cur.previous_hash != hash_block(prev) {
            tracing::warn!(index = cur.index, "back-link mismatch");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GENESIS_PREVIOUS_HASH;

    fn assert_genesis_only(l: &Ledger) {
        assert_eq!(l.len(), 1);
        let g = l.last_block();
        assert_eq!(g.index, 1);
        assert!(g.records.is_empty());
        assert_eq!(g.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(l.pending().is_empty());
        assert!(l.verify());
    }

    #[test]
    fn new_ledger_has_genesis() {
        assert_genesis_only(&Ledger::new());
    }

    #[test]
    fn append_rejects_blank_fields() {
        let mut l = Ledger::new();
        assert_eq!(
            l.append_record("", "b", "h", None),
            Err(LedgerError::InvalidRecord { field: "sender" })
        );
        assert_eq!(
            l.append_record("a", "b", " ", None),
            Err(LedgerError::InvalidRecord {
                field: "content_hash"
            })
        );
        assert!(l.pending().is_empty());
    }

    #[test]
    fn seal_preserves_append_order_and_clears_pending() {
        let mut l = Ledger::new();
        for i in 0..5 {
            l.append_record(format!("s{i}"), "r", format!("h{i}"), None)
                .unwrap();
        }
        let block = l.seal_block(None);
        let senders: Vec<_> = block.records.iter().map(|r| r.sender.as_str()).collect();
        assert_eq!(senders, ["s0", "s1", "s2", "s3", "s4"]);
        assert!(l.pending().is_empty());
        assert_eq!(l.last_block(), &block);
    }

    #[test]
    fn indices_stay_contiguous() {
        let mut l = Ledger::new();
        for _ in 0..7 {
            l.seal_block(None);
        }
        assert_eq!(l.len(), 8);
        for (i, b) in l.chain().iter().enumerate() {
            assert_eq!(b.index, i as u64 + 1);
        }
        assert!(l.verify());
    }

    #[test]
    fn empty_seal_is_allowed() {
        let mut l = Ledger::new();
        let b = l.seal_block(None);
        assert_eq!(b.index, 2);
        assert!(b.records.is_empty());
        assert!(l.verify());
    }

    #[test]
    fn scenario_two_transfers() {
        let mut l = Ledger::new();
        assert_eq!(l.len(), 1);

        assert_eq!(
            l.append_record("A", "B", "h1", Some("note".into())),
            Ok(2)
        );
        let b2 = l.seal_block(None);
        assert_eq!(b2.previous_hash, hash_block(&l.chain()[0]));
        assert_eq!(
            b2.records,
            vec![Record::new("A", "B", "h1", Some("note".into())).unwrap()]
        );

        assert_eq!(l.append_record("B", "C", "h2", None), Ok(3));
        let b3 = l.seal_block(None);
        assert_eq!(b3.previous_hash, hash_block(&b2));
        assert!(l.verify());

        l.chain[1].records[0].content_hash = "h9".into();
        assert!(!l.verify());
    }

    #[test]
    fn tampering_any_non_last_block_is_detected() {
        let mut base = Ledger::new();
        for i in 0..3 {
            base.append_record("a", "b", format!("h{i}"), Some("d".into()))
                .unwrap();
            base.seal_block(None);
        }
        assert!(base.verify());

        for i in 0..base.len() - 1 {
            let mut l = base.clone();
            l.chain[i].index += 100;
            assert!(!l.verify(), "index tamper in block {}", i + 1);

            let mut l = base.clone();
            l.chain[i].timestamp += time::Duration::seconds(1);
            assert!(!l.verify(), "timestamp tamper in block {}", i + 1);

            let mut l = base.clone();
            l.chain[i].previous_hash = "f".repeat(64);
            assert!(!l.verify(), "back-link tamper in block {}", i + 1);

            if i > 0 {
                let mut l = base.clone();
                l.chain[i].records[0].recipient = "mallory".into();
                assert!(!l.verify(), "record tamper in block {}", i + 1);
            }
        }

        // The last block has no successor, so editing it goes unnoticed.
        let mut l = base.clone();
        let last = l.chain.len() - 1;
        l.chain[last].records[0].content_hash = "zz".into();
        assert!(l.verify());
    }

    #[test]
    fn override_hash_is_used_verbatim() {
        let mut l = Ledger::new();
        let good = hash_block(l.last_block());
        let b = l.seal_block(Some(good.clone()));
        assert_eq!(b.previous_hash, good);
        assert!(l.verify());

        let b = l.seal_block(Some("bogus".into()));
        assert_eq!(b.previous_hash, "bogus");
        assert!(!l.verify());
    }

    #[test]
    fn fetch_records_bounds() {
        let mut l = Ledger::new();
        l.append_record("a", "b", "h", None).unwrap();
        l.seal_block(None);

        assert!(l.fetch_records(1).unwrap().is_empty());
        assert_eq!(l.fetch_records(2).unwrap()[0].content_hash, "h");
        assert_eq!(
            l.fetch_records(0),
            Err(LedgerError::IndexOutOfRange { index: 0, len: 2 })
        );
        assert_eq!(
            l.fetch_records(3),
            Err(LedgerError::IndexOutOfRange { index: 3, len: 2 })
        );
    }

    #[test]
    fn reset_is_idempotent() {
        let mut l = Ledger::new();
        l.append_record("a", "b", "h", None).unwrap();
        l.seal_block(None);
        l.append_record("c", "d", "h2", None).unwrap();

        l.reset();
        assert_genesis_only(&l);
        l.reset();
        assert_genesis_only(&l);
    }

    #[test]
    fn verify_chain_on_slices() {
        assert!(verify_chain(&[]));
        assert!(verify_chain(&[Block::genesis()]));
    }
}
