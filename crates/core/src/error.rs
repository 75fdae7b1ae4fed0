//! Error types for the fallible parts of the core
//!
//! Retarget and proof checks take adversarial input and answer with values,
//! so they have no error type. Only chain mutation, parameter validation and
//! the hash context can fail.

use thiserror::Error;

use crate::block::BlockHash;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChainError {
    #[error("Unknown parent block {0}")]
    UnknownParent(BlockHash),

    #[error("Block {0} already stored")]
    Duplicate(BlockHash),

    #[error("Unknown block {0}")]
    UnknownBlock(BlockHash),

    #[error("Chain height overflow")]
    HeightOverflow,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParamsError {
    #[error("Invalid consensus parameters: {0}")]
    Invalid(&'static str),
}

/// Failures reported by a hash library backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashLibraryError {
    #[error("Cache allocation failed: {0}")]
    CacheAllocation(String),

    #[error("Cache initialisation failed: {0}")]
    CacheInit(String),

    #[error("VM creation failed: {0}")]
    VmCreation(String),

    #[error("Hash computation failed: {0}")]
    Compute(String),
}

/// Hash context failures. The node cannot validate proof-of-work without a
/// working context, so callers treat every variant as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Hash context unavailable for seed {seed}: {source}")]
    Context {
        seed: BlockHash,
        #[source]
        source: HashLibraryError,
    },

    #[error("Hash computation failed: {0}")]
    Compute(#[from] HashLibraryError),
}
