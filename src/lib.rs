//! RX2 consensus tooling
//!
//! Difficulty retargeting, proof-of-work checks and seeded hashing for a
//! hybrid PoW/PoS chain, with the configuration and fixture plumbing the
//! `rx2pow` binary needs.
//!
//! # Example
//!
//! ```rust
//! use rx2pow::chainfile::ChainFixture;
//! use rx2pow::consensus::{ChainReader, ConsensusParams, ProofKind, next_work_required};
//!
//! let fixture = ChainFixture::from_json(r#"{
//!     "genesis": { "time": 0, "bits": "1f00ffff" },
//!     "blocks": [ { "time": 150, "bits": "1f00ffff" } ]
//! }"#).unwrap();
//! let store = fixture.build().unwrap();
//!
//! let view = store.read();
//! let params = ConsensusParams::main();
//! let bits = next_work_required(&view, Some(view.tip()), 300, &params, ProofKind::Work);
//! assert_eq!(bits, 0x1f00ffff);
//! ```

// Re-export the consensus core
pub use rx2_core as consensus;

pub mod chainfile;
pub mod config;
#[cfg(feature = "cli")]
pub mod logging;

// Convenience re-exports
pub use consensus::{ChainStore, ConsensusParams, PowChecker, ProofKind, next_work_required};
