//! Full proof-of-work check for a serialized header
//!
//! Seed selection, the seeded hash and the target check, wired together the
//! way block validation and template evaluation use them.

use crate::block::BlockHash;
use crate::chain::ChainReader;
use crate::engine::{HashEngine, HashLibrary};
use crate::error::EngineError;
use crate::params::ConsensusParams;
use crate::seed::{SeedCachePolicy, SeedSelector};
use crate::verify::check_proof_of_work;

/// Outcome of [`PowChecker::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowCheck {
    pub seed: BlockHash,
    pub hash: BlockHash,
    pub valid: bool,
}

/// Owns the seed cache and the hash context for one network
pub struct PowChecker<L: HashLibrary> {
    params: ConsensusParams,
    seeds: SeedSelector,
    engine: HashEngine<L>,
    memoize: bool,
}

impl<L: HashLibrary> PowChecker<L> {
    pub fn new(params: ConsensusParams, policy: SeedCachePolicy, library: L) -> Self {
        let seeds = SeedSelector::new(&params, policy);
        Self {
            params,
            seeds,
            engine: HashEngine::new(library),
            memoize: false,
        }
    }

    /// Answer repeated identical inputs from the engine's one-entry memo.
    pub fn with_memo(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn seeds(&self) -> &SeedSelector {
        &self.seeds
    }

    /// PoW hash of `header` for a block at `height`.
    pub fn pow_hash<C: ChainReader + ?Sized>(
        &self,
        chain: &C,
        height: u32,
        header: &[u8],
    ) -> Result<(BlockHash, BlockHash), EngineError> {
        let seed = self.seeds.seed_for_height(chain, height);
        let bytes = if self.memoize {
            self.engine.hash_memoized(header, &seed)?
        } else {
            self.engine.hash(header, &seed)?
        };
        Ok((seed, BlockHash(bytes)))
    }

    /// Hash `header` and check it against `bits`.
    ///
    /// An `Err` means the hash context could not be built; the block was not
    /// judged and the caller must not continue validating.
    pub fn check<C: ChainReader + ?Sized>(
        &self,
        chain: &C,
        height: u32,
        header: &[u8],
        bits: u32,
    ) -> Result<PowCheck, EngineError> {
        let (seed, hash) = self.pow_hash(chain, height, header)?;
        Ok(PowCheck {
            seed,
            hash,
            valid: check_proof_of_work(&hash, bits, &self.params),
        })
    }
}
