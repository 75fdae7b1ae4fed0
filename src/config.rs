//! Node configuration
//!
//! A JSON file selecting the network preset, optional per-field overrides of
//! the consensus parameters, the log filter and the hash engine options.
//!
//! ```json
//! {
//!   "network": "test",
//!   "params": { "lwma_averaging_window": 60, "retarget_algorithm": "legacy-ema" },
//!   "log_filter": "rx2_core=debug",
//!   "hash_memo": true,
//!   "seed_cache": "height-window"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consensus::{
    ConsensusParams, Network, ParamsError, RetargetAlgorithm, SeedCachePolicy, U256,
    target_from_hex,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("Invalid target for {field}: {value}")]
    InvalidTarget { field: &'static str, value: String },

    #[error(transparent)]
    Params(#[from] ParamsError),
}

/// Consensus fields a config file may override on top of the preset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamsOverrides {
    pub pow_limit: Option<String>,
    pub pos_limit: Option<String>,
    pub pow_allow_min_difficulty_blocks: Option<bool>,
    pub pow_no_retargeting: Option<bool>,
    pub pos_no_retargeting: Option<bool>,
    pub pow_target_spacing: Option<i64>,
    pub lwma_averaging_window: Option<i64>,
    pub retarget_algorithm: Option<RetargetAlgorithm>,
    pub qip9_height: Option<u32>,
    pub reduce_blocktime_height: Option<u32>,
    pub rx2_seed_height: Option<u32>,
    pub rx2_seed_interval: Option<u32>,
}

impl ParamsOverrides {
    /// Apply the overrides to `params` in place.
    pub fn apply(&self, params: &mut ConsensusParams) -> Result<(), ConfigError> {
        if let Some(hex) = &self.pow_limit {
            params.pow_limit = parse_target("pow_limit", hex)?;
        }
        if let Some(hex) = &self.pos_limit {
            params.pos_limit = parse_target("pos_limit", hex)?;
        }
        if let Some(v) = self.pow_allow_min_difficulty_blocks {
            params.pow_allow_min_difficulty_blocks = v;
        }
        if let Some(v) = self.pow_no_retargeting {
            params.pow_no_retargeting = v;
        }
        if let Some(v) = self.pos_no_retargeting {
            params.pos_no_retargeting = v;
        }
        if let Some(v) = self.pow_target_spacing {
            params.pow_target_spacing = v;
        }
        if let Some(v) = self.lwma_averaging_window {
            params.lwma_averaging_window = v;
        }
        if let Some(v) = self.retarget_algorithm {
            params.retarget_algorithm = v;
        }
        if let Some(v) = self.qip9_height {
            params.qip9_height = v;
        }
        if let Some(v) = self.reduce_blocktime_height {
            params.reduce_blocktime_height = v;
        }
        if let Some(v) = self.rx2_seed_height {
            params.rx2_seed_height = v;
        }
        if let Some(v) = self.rx2_seed_interval {
            params.rx2_seed_interval = v;
        }
        Ok(())
    }
}

fn parse_target(field: &'static str, value: &str) -> Result<U256, ConfigError> {
    target_from_hex(value).map_err(|_| ConfigError::InvalidTarget {
        field,
        value: value.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub network: Network,
    pub params: ParamsOverrides,
    /// `tracing` filter directive; `RUST_LOG` wins when set
    pub log_filter: Option<String>,
    /// Memoize the last hash for repeated template evaluation
    pub hash_memo: bool,
    pub seed_cache: SeedCachePolicy,
}

impl NodeConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load `path`, or the default location when `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit path
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load_from_file(&path)
                } else {
                    debug!(path = %path.display(), "No config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Preset for the configured network with the overrides applied,
    /// validated.
    pub fn consensus_params(&self) -> Result<ConsensusParams, ConfigError> {
        let mut params = ConsensusParams::for_network(self.network);
        self.params.apply(&mut params)?;
        params.validate()?;
        Ok(params)
    }
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    #[cfg(feature = "cli")]
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    #[cfg(not(feature = "cli"))]
    let home = PathBuf::from(".");
    home.join(".rx2pow").join("config.json")
}
