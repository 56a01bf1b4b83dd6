use proptest::prelude::*;

use doc_ledger::hasher::hash_block;
use doc_ledger::ledger::{verify_chain, Ledger};

#[derive(Debug, Clone)]
struct Transfer {
    sender: String,
    recipient: String,
    content_hash: String,
    description: Option<String>,
}

fn transfer() -> impl Strategy<Value = Transfer> {
    (
        "[a-z]{1,8}",
        "[a-z]{1,8}",
        "[0-9a-f]{1,64}",
        proptest::option::of(".{0,16}"),
    )
        .prop_map(|(sender, recipient, content_hash, description)| Transfer {
            sender,
            recipient,
            content_hash,
            description,
        })
}

/// Blocks of transfers; an inner empty vec seals an empty block.
fn batches() -> impl Strategy<Value = Vec<Vec<Transfer>>> {
    proptest::collection::vec(proptest::collection::vec(transfer(), 0..4), 1..6)
}

fn build(batches: &[Vec<Transfer>]) -> Ledger {
    let mut ledger = Ledger::new();
    for batch in batches {
        for t in batch {
            ledger
                .append_record(
                    t.sender.clone(),
                    t.recipient.clone(),
                    t.content_hash.clone(),
                    t.description.clone(),
                )
                .unwrap();
        }
        ledger.seal_block(None);
    }
    ledger
}

proptest! {
    #[test]
    fn sealed_chains_verify(batches in batches()) {
        let ledger = build(&batches);
        prop_assert_eq!(ledger.len(), batches.len() + 1);
        prop_assert!(ledger.verify());
        for (i, block) in ledger.chain().iter().enumerate() {
            prop_assert_eq!(block.index, i as u64 + 1);
        }
        for (block, batch) in ledger.chain()[1..].iter().zip(&batches) {
            let hashes: Vec<_> = block.records.iter().map(|r| r.content_hash.clone()).collect();
            let expected: Vec<_> = batch.iter().map(|t| t.content_hash.clone()).collect();
            prop_assert_eq!(hashes, expected);
        }
    }

    #[test]
    fn tampered_content_is_detected(batches in batches(), pick in any::<prop::sample::Index>()) {
        let ledger = build(&batches);
        let mut chain = ledger.chain().to_vec();
        // Only blocks with a successor are covered by a back-link.
        let candidates: Vec<usize> = (0..chain.len() - 1)
            .filter(|&i| !chain[i].records.is_empty())
            .collect();
        prop_assume!(!candidates.is_empty());

        let i = candidates[pick.index(candidates.len())];
        let before = hash_block(&chain[i]);
        chain[i].records[0].content_hash.push('x');
        prop_assert_ne!(hash_block(&chain[i]), before);
        prop_assert!(!verify_chain(&chain));
    }
}
