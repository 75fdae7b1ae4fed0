//! Proof-kind filtered ancestor sampling
//!
//! A hybrid chain interleaves PoW and PoS blocks, and each kind retargets
//! against its own history. These walks skip blocks of the other kind.

use crate::block::{BlockRecord, ProofKind};
use crate::chain::ChainReader;

/// Heights of the most recent blocks of one proof kind, newest first.
///
/// Indexing is 1-based: index 1 is the most recent matching block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProofWindow {
    heights: Vec<u32>,
}

impl ProofWindow {
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Height of the sample at 1-based `index`
    pub fn height(&self, index: usize) -> Option<u32> {
        index.checked_sub(1).and_then(|i| self.heights.get(i)).copied()
    }

    /// `(index, height)` pairs, newest first
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.heights.iter().enumerate().map(|(i, h)| (i + 1, *h))
    }
}

/// Walk predecessors from `start` (inclusive) collecting up to `limit`
/// blocks of `kind`.
///
/// The genesis record is never sampled; reaching it ends the walk, so a
/// young chain yields a short window rather than an error.
pub fn sample_window<C: ChainReader + ?Sized>(
    chain: &C,
    start: &BlockRecord,
    limit: usize,
    kind: ProofKind,
) -> ProofWindow {
    let mut heights = Vec::with_capacity(limit);
    let mut cursor = Some(start);

    while let Some(block) = cursor {
        if heights.len() >= limit || block.is_genesis() {
            break;
        }
        if block.proof == kind {
            heights.push(block.height);
        }
        cursor = chain.predecessor(block);
    }

    ProofWindow { heights }
}

/// Most recent block of `kind` at or below `block`, or the genesis record.
pub fn last_block_of_kind<'a, C: ChainReader + ?Sized>(
    chain: &'a C,
    block: &'a BlockRecord,
    kind: ProofKind,
) -> &'a BlockRecord {
    let mut cursor = block;
    while cursor.proof != kind {
        match chain.predecessor(cursor) {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    cursor
}

/// Number of PoS blocks above `min_height` on `block`'s branch, genesis excluded.
pub fn count_stake_blocks<C: ChainReader + ?Sized>(
    chain: &C,
    block: &BlockRecord,
    min_height: u32,
) -> usize {
    let mut found = 0;
    let mut cursor = Some(block);
    while let Some(b) = cursor {
        if b.is_genesis() || b.height <= min_height {
            break;
        }
        if b.is_proof_of_stake() {
            found += 1;
        }
        cursor = chain.predecessor(b);
    }
    found
}
