//! Seed block selection for the memory-hard hash
//!
//! Heights are grouped into windows of `rx2_seed_interval` blocks. Inside a
//! window, heights past the switch offset (`rx2_seed_height % interval`) are
//! anchored at the window's first height; the rest still use the previous
//! window's first height. The seed block sits `rx2_seed_height` blocks below
//! the anchor, so every node has it long before the window opens.
//!
//! ```text
//! remainder = height % interval
//! anchor    = height - remainder             if remainder > switch
//!           = height - interval - remainder  otherwise
//! seed      = hash of active block (anchor - rx2_seed_height), or genesis
//! ```

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::block::BlockHash;
use crate::chain::ChainReader;
use crate::params::ConsensusParams;

/// How a cached seed is trusted on later lookups in the same window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedCachePolicy {
    /// Reuse the cached seed for as long as the anchor height is unchanged.
    ///
    /// A reorg that replaces the seed block without moving the anchor keeps
    /// serving the old hash until the next window. Only for compatibility
    /// with networks that were validated this way.
    HeightWindow,
    /// Check the cached seed block is still on the active chain at its
    /// height; a mismatch invalidates the entry.
    #[default]
    BlockIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CachedSeed {
    anchor: u32,
    height: u32,
    hash: BlockHash,
}

/// Selects and caches the current seed block
#[derive(Debug)]
pub struct SeedSelector {
    seed_height: u32,
    interval: u32,
    policy: SeedCachePolicy,
    current: Mutex<Option<CachedSeed>>,
}

impl SeedSelector {
    pub fn new(params: &ConsensusParams, policy: SeedCachePolicy) -> Self {
        Self {
            seed_height: params.rx2_seed_height,
            interval: params.rx2_seed_interval.max(1),
            policy,
            current: Mutex::new(None),
        }
    }

    /// Anchor height for `height`, or `None` when the window arithmetic
    /// would fall below zero.
    pub fn anchor_height(&self, height: u32) -> Option<u32> {
        let switch = self.seed_height % self.interval;
        let remainder = height % self.interval;
        let window_start = height - remainder;
        if remainder > switch {
            Some(window_start)
        } else {
            window_start.checked_sub(self.interval)
        }
    }

    /// Height of the block seeding `height`; genesis before seeding starts.
    pub fn seed_block_height(&self, height: u32) -> u32 {
        self.anchor_height(height)
            .and_then(|anchor| anchor.checked_sub(self.seed_height))
            .unwrap_or(0)
    }

    /// Seed hash for a block at `height`.
    ///
    /// `chain` must be a view taken under the chain lock; the cache is only
    /// read and written while that view is alive.
    pub fn seed_for_height<C: ChainReader + ?Sized>(&self, chain: &C, height: u32) -> BlockHash {
        let anchor = self.anchor_height(height).unwrap_or(0);
        let mut current = self.current.lock();

        if let Some(cached) = *current
            && cached.anchor == anchor
        {
            match self.policy {
                SeedCachePolicy::HeightWindow => return cached.hash,
                SeedCachePolicy::BlockIdentity => {
                    let on_chain = chain.at_height(cached.height).map(|b| b.hash);
                    if on_chain == Some(cached.hash) {
                        debug!(height, seed = %cached.hash, "Seed cache hit");
                        return cached.hash;
                    }
                    warn!(
                        height,
                        seed_height = cached.height,
                        stale = %cached.hash,
                        "Seed block replaced by reorg, reselecting"
                    );
                }
            }
        }

        let seed_height = self.seed_block_height(height);
        let hash = match chain.at_height(seed_height) {
            Some(block) => block.hash,
            None => {
                warn!(height, seed_height, "Seed block not on active chain, using genesis");
                chain.genesis().hash
            }
        };

        debug!(height, anchor, seed_height, seed = %hash, "Seed selected");
        *current = Some(CachedSeed {
            anchor,
            height: seed_height,
            hash,
        });
        hash
    }

    /// Drop the cached seed; the next lookup reselects from the chain.
    pub fn invalidate(&self) {
        *self.current.lock() = None;
    }
}
