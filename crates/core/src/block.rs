//! Block records as the consensus core sees them

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::arith::U256;

/// Index of a block record inside the chain store arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) usize);

/// How a block was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
    #[serde(alias = "pow")]
    Work,
    #[serde(alias = "pos")]
    Stake,
}

impl ProofKind {
    pub fn is_stake(self) -> bool {
        matches!(self, ProofKind::Stake)
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofKind::Work => f.write_str("PoW"),
            ProofKind::Stake => f.write_str("PoS"),
        }
    }
}

/// 256-bit block identity, stored little-endian like the hash function emits it
///
/// Displayed byte-reversed (most significant byte first), which is also the
/// form used as seed material for the hash library.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub const ZERO: BlockHash = BlockHash([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The hash read as an unsigned little-endian magnitude.
    pub fn to_u256(&self) -> U256 {
        U256::from_little_endian(&self.0)
    }

    pub fn from_u256(value: &U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_little_endian(&mut bytes);
        Self(bytes)
    }

    /// Display-order hex (64 lowercase characters).
    pub fn to_hex(&self) -> String {
        let mut reversed = self.0;
        reversed.reverse();
        hex::encode(reversed)
    }

    /// Parse display-order hex.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        bytes.reverse();
        Ok(Self(bytes))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

/// Header data a new block contributes to the chain store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub hash: BlockHash,
    pub proof: ProofKind,
    pub time: i64,
    pub bits: u32,
}

/// A block accepted into the chain store. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub id: BlockId,
    pub height: u32,
    pub prev: Option<BlockId>,
    pub hash: BlockHash,
    pub proof: ProofKind,
    pub time: i64,
    pub bits: u32,
}

impl BlockRecord {
    pub fn is_genesis(&self) -> bool {
        self.prev.is_none()
    }

    pub fn is_proof_of_stake(&self) -> bool {
        self.proof.is_stake()
    }
}
