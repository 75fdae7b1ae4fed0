//! # RX2 Consensus Core
//!
//! Difficulty retargeting and proof-of-work verification for a hybrid
//! PoW/PoS chain, plus the seeded memory-hard hash context that evaluates
//! proof-of-work.
//!
//! ## Components
//!
//! - **Chain store**: arena of block records behind one `RwLock`; a
//!   [`ChainView`] read guard is the capability every traversal takes
//! - **Window sampling**: most recent blocks of one proof kind
//! - **LWMA**: linearly weighted moving-average retarget (default)
//! - **Legacy EMA**: per-block exponential retarget, also the young-PoS fallback
//! - **Proof check**: hash against a compact target
//! - **Seed selection**: which block seeds the hash for a height
//! - **Hash engine**: one `(seed, cache, vm)` context, rebuilt on seed rotation
//!
//! ## Example
//!
//! ```rust
//! use rx2_core::{BlockHash, BlockHeader, ChainReader, ChainStore, ConsensusParams, ProofKind};
//! use rx2_core::next_work_required;
//!
//! let params = ConsensusParams::main();
//! let store = ChainStore::new(BlockHeader {
//!     hash: BlockHash([0x11; 32]),
//!     proof: ProofKind::Work,
//!     time: 0,
//!     bits: 0x1f00ffff,
//! });
//!
//! let view = store.read();
//! let bits = next_work_required(&view, Some(view.tip()), 150, &params, ProofKind::Work);
//! assert_eq!(bits, 0x1f00ffff);
//! ```

mod arith;
mod block;
mod chain;
mod engine;
mod error;
mod legacy;
mod library;
mod lwma;
mod params;
mod pow;
mod retarget;
mod seed;
mod verify;
mod window;

pub use arith::{
    DecodedTarget, U256, compact_from_target, decode_compact, mul_exp, target_from_compact,
    target_from_hex, target_to_hex,
};
pub use block::{BlockHash, BlockHeader, BlockId, BlockRecord, ProofKind};
pub use chain::{ChainReader, ChainStore, ChainView, Reorg};
pub use engine::{HashEngine, HashLibrary, seed_key};
pub use error::{ChainError, EngineError, HashLibraryError, ParamsError};
pub use legacy::{calculate_next_work, ema_step};
pub use library::UHashLibrary;
#[cfg(feature = "randomx")]
pub use library::RandomXLibrary;
pub use lwma::{MAX_SOLVETIME_FACTOR, next_work_lwma};
pub use params::{ConsensusParams, Network, RetargetAlgorithm, target_hex};
pub use pow::{PowCheck, PowChecker};
pub use retarget::next_work_required;
pub use seed::{SeedCachePolicy, SeedSelector};
pub use verify::check_proof_of_work;
pub use window::{ProofWindow, count_stake_blocks, last_block_of_kind, sample_window};

#[cfg(test)]
mod tests;
