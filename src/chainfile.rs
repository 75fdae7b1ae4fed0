//! JSON chain fixtures
//!
//! The CLI and the integration tests drive the consensus core over chains
//! described in JSON. Blocks without a `parent` extend the previous entry;
//! blocks without a `hash` get one synthesized with SHA-256 over their
//! parent, height, time, bits and proof kind.
//!
//! ```json
//! {
//!   "genesis": { "time": 0, "bits": "1f00ffff" },
//!   "blocks": [
//!     { "time": 150, "bits": "1f00ffff", "proof": "pow" },
//!     { "time": 300, "bits": "1f00ffff", "proof": "pos" }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::consensus::{
    BlockHash, BlockHeader, ChainError, ChainReader, ChainStore, ProofKind,
};

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Invalid fixture: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("Invalid hash {0}")]
    InvalidHash(String),

    #[error("Invalid compact bits {0}")]
    InvalidBits(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockEntry {
    pub time: i64,
    /// Compact bits as hex, `0x` optional
    pub bits: String,
    #[serde(default = "default_proof")]
    pub proof: ProofKind,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
}

fn default_proof() -> ProofKind {
    ProofKind::Work
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainFixture {
    pub genesis: BlockEntry,
    #[serde(default)]
    pub blocks: Vec<BlockEntry>,
    /// Block to make active; defaults to the last entry
    #[serde(default)]
    pub tip: Option<String>,
}

impl ChainFixture {
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, FixtureError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Build the chain store the fixture describes.
    pub fn build(&self) -> Result<ChainStore, FixtureError> {
        let genesis = header(&self.genesis, None, 0)?;
        let store = ChainStore::new(genesis.clone());

        let mut previous = (genesis.hash, 0u32);
        for entry in &self.blocks {
            let parent = match &entry.parent {
                Some(hex) => parse_hash(hex)?,
                None => previous.0,
            };
            let parent_height = if parent == previous.0 {
                previous.1
            } else {
                store
                    .read()
                    .find(&parent)
                    .map(|b| b.height)
                    .ok_or(ChainError::UnknownParent(parent))?
            };
            let height = parent_height + 1;
            let header = header(entry, Some(&parent), height)?;
            store.insert(&parent, header.clone())?;
            previous = (header.hash, height);
        }

        let tip = match &self.tip {
            Some(hex) => parse_hash(hex)?,
            None => previous.0,
        };
        store.activate(&tip)?;
        Ok(store)
    }
}

/// Load and build a fixture file.
pub fn load_chain(path: &Path) -> Result<ChainStore, FixtureError> {
    ChainFixture::load_from_file(path)?.build()
}

pub fn parse_hash(hex: &str) -> Result<BlockHash, FixtureError> {
    BlockHash::from_hex(hex).map_err(|_| FixtureError::InvalidHash(hex.to_string()))
}

pub fn parse_bits(hex: &str) -> Result<u32, FixtureError> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    u32::from_str_radix(digits, 16).map_err(|_| FixtureError::InvalidBits(hex.to_string()))
}

fn header(entry: &BlockEntry, parent: Option<&BlockHash>, height: u32) -> Result<BlockHeader, FixtureError> {
    let bits = parse_bits(&entry.bits)?;
    let hash = match &entry.hash {
        Some(hex) => parse_hash(hex)?,
        None => synthetic_hash(parent, height, entry.time, bits, entry.proof),
    };
    Ok(BlockHeader {
        hash,
        proof: entry.proof,
        time: entry.time,
        bits,
    })
}

fn synthetic_hash(
    parent: Option<&BlockHash>,
    height: u32,
    time: i64,
    bits: u32,
    proof: ProofKind,
) -> BlockHash {
    let mut hasher = Sha256::new();
    hasher.update(parent.map_or([0u8; 32], |p| *p.as_bytes()));
    hasher.update(height.to_le_bytes());
    hasher.update(time.to_le_bytes());
    hasher.update(bits.to_le_bytes());
    hasher.update([proof.is_stake() as u8]);
    BlockHash(hasher.finalize().into())
}
