//! Consensus parameters for the RX2 networks
//!
//! Loaded once at startup and never mutated by the consensus core. Spacing,
//! timespan, stake-timestamp granularity and the PoS limit follow a height
//! schedule with two switch points: `qip9_height` and
//! `reduce_blocktime_height`.

use serde::{Deserialize, Serialize};

use crate::arith::{U256, target_from_hex, target_to_hex};
use crate::block::ProofKind;
use crate::error::ParamsError;

/// Which retarget rule computes the next required bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetargetAlgorithm {
    /// Linearly weighted moving average over the last N same-kind blocks
    Lwma,
    /// Per-block exponential moving average toward the target spacing
    LegacyEma,
}

/// Network presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Main,
    Test,
    Regtest,
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
        })
    }
}

impl core::str::FromStr for Network {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            "regtest" => Ok(Network::Regtest),
            _ => Err(ParamsError::Invalid("unknown network")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    #[serde(with = "target_hex")]
    pub pow_limit: U256,
    #[serde(with = "target_hex")]
    pub pos_limit: U256,
    #[serde(with = "target_hex")]
    pub qip9_pos_limit: U256,
    #[serde(with = "target_hex")]
    pub rbt_pos_limit: U256,

    pub pow_allow_min_difficulty_blocks: bool,
    pub pow_no_retargeting: bool,
    pub pos_no_retargeting: bool,

    pub pow_target_spacing: i64,
    pub rbt_pow_target_spacing: i64,
    pub pow_target_timespan: i64,
    pub pow_target_timespan_v2: i64,
    pub rbt_pow_target_timespan: i64,

    pub qip9_height: u32,
    pub reduce_blocktime_height: u32,

    pub stake_timestamp_mask: u32,
    pub rbt_stake_timestamp_mask: u32,

    /// LWMA averaging window N
    pub lwma_averaging_window: i64,
    pub retarget_algorithm: RetargetAlgorithm,

    /// Height offset of the seed block behind its window start
    pub rx2_seed_height: u32,
    /// Size of a seed window in blocks
    pub rx2_seed_interval: u32,
}

impl ConsensusParams {
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Main => Self::main(),
            Network::Test => Self::test(),
            Network::Regtest => Self::regtest(),
        }
    }

    pub fn main() -> Self {
        Self {
            pow_limit: limit("0000ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"),
            pos_limit: limit("00000000ffffffffffffffffffffffffffffffffffffffffffffffffffffffff"),
            qip9_pos_limit: limit("0000000000001fffffffffffffffffffffffffffffffffffffffffffffffffff"),
            rbt_pos_limit: limit("0000000000003fffffffffffffffffffffffffffffffffffffffffffffffffff"),
            pow_allow_min_difficulty_blocks: false,
            pow_no_retargeting: false,
            pos_no_retargeting: false,
            pow_target_spacing: 150,
            rbt_pow_target_spacing: 150,
            pow_target_timespan: 16 * 60,
            pow_target_timespan_v2: 4000,
            rbt_pow_target_timespan: 4000,
            qip9_height: 0,
            reduce_blocktime_height: u32::MAX,
            stake_timestamp_mask: 15,
            rbt_stake_timestamp_mask: 15,
            lwma_averaging_window: 120,
            retarget_algorithm: RetargetAlgorithm::Lwma,
            rx2_seed_height: 1000,
            rx2_seed_interval: 2048,
        }
    }

    pub fn test() -> Self {
        Self {
            pow_allow_min_difficulty_blocks: true,
            rx2_seed_height: 100,
            rx2_seed_interval: 256,
            ..Self::main()
        }
    }

    pub fn regtest() -> Self {
        Self {
            pow_limit: limit("7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"),
            pos_limit: limit("7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"),
            qip9_pos_limit: limit("7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"),
            rbt_pos_limit: limit("7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"),
            pow_allow_min_difficulty_blocks: true,
            pow_no_retargeting: true,
            pos_no_retargeting: true,
            lwma_averaging_window: 10,
            rx2_seed_height: 10,
            rx2_seed_interval: 32,
            ..Self::main()
        }
    }

    /// Reject parameter sets the engines cannot run with.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.lwma_averaging_window < 1 {
            return Err(ParamsError::Invalid("lwma_averaging_window must be >= 1"));
        }
        if self.pow_target_spacing < 1 || self.rbt_pow_target_spacing < 1 {
            return Err(ParamsError::Invalid("target spacing must be >= 1"));
        }
        if self.pow_target_timespan < self.pow_target_spacing
            || self.pow_target_timespan_v2 < self.pow_target_spacing
            || self.rbt_pow_target_timespan < self.rbt_pow_target_spacing
        {
            return Err(ParamsError::Invalid("target timespan shorter than spacing"));
        }
        if self.rx2_seed_interval == 0 {
            return Err(ParamsError::Invalid("rx2_seed_interval must be >= 1"));
        }
        if [
            self.pow_limit,
            self.pos_limit,
            self.qip9_pos_limit,
            self.rbt_pos_limit,
        ]
        .iter()
        .any(U256::is_zero)
        {
            return Err(ParamsError::Invalid("proof limits must be non-zero"));
        }
        Ok(())
    }

    pub fn no_retargeting(&self, kind: ProofKind) -> bool {
        match kind {
            ProofKind::Work => self.pow_no_retargeting,
            ProofKind::Stake => self.pos_no_retargeting,
        }
    }

    /// Base limit for a proof kind, used by the LWMA engine.
    pub fn proof_limit(&self, kind: ProofKind) -> U256 {
        match kind {
            ProofKind::Work => self.pow_limit,
            ProofKind::Stake => self.pos_limit,
        }
    }

    /// Height-scheduled limit, used by the EMA engine and the work entry point.
    pub fn proof_limit_at(&self, kind: ProofKind, height: u32) -> U256 {
        match kind {
            ProofKind::Work => self.pow_limit,
            ProofKind::Stake if height < self.qip9_height => self.pos_limit,
            ProofKind::Stake if height < self.reduce_blocktime_height => self.qip9_pos_limit,
            ProofKind::Stake => self.rbt_pos_limit,
        }
    }

    pub fn target_spacing(&self, height: u32) -> i64 {
        if height < self.reduce_blocktime_height {
            self.pow_target_spacing
        } else {
            self.rbt_pow_target_spacing
        }
    }

    pub fn target_timespan(&self, height: u32) -> i64 {
        if height < self.qip9_height {
            self.pow_target_timespan
        } else if height < self.reduce_blocktime_height {
            self.pow_target_timespan_v2
        } else {
            self.rbt_pow_target_timespan
        }
    }

    pub fn difficulty_adjustment_interval(&self, height: u32) -> i64 {
        self.target_timespan(height) / self.target_spacing(height)
    }

    pub fn stake_timestamp_mask(&self, height: u32) -> u32 {
        if height < self.reduce_blocktime_height {
            self.stake_timestamp_mask
        } else {
            self.rbt_stake_timestamp_mask
        }
    }
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self::main()
    }
}

fn limit(s: &str) -> U256 {
    // Preset literals are 64 hex digits.
    target_from_hex(s).unwrap_or(U256::MAX)
}

/// Serde adapter: targets as big-endian hex strings
pub mod target_hex {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use crate::arith::{U256, target_from_hex, target_to_hex};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&target_to_hex(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        target_from_hex(&s).map_err(D::Error::custom)
    }
}

impl core::fmt::Display for ConsensusParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "pow_limit:       {}", target_to_hex(&self.pow_limit))?;
        writeln!(f, "pos_limit:       {}", target_to_hex(&self.pos_limit))?;
        writeln!(f, "algorithm:       {:?}", self.retarget_algorithm)?;
        writeln!(f, "lwma window:     {}", self.lwma_averaging_window)?;
        writeln!(f, "target spacing:  {}s", self.pow_target_spacing)?;
        write!(
            f,
            "seed schedule:   start {} / interval {}",
            self.rx2_seed_height, self.rx2_seed_interval
        )
    }
}
