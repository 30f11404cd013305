//! Configuration types for RelayVote

use crate::error::RelayVoteError;
use crate::traits::RelayVoteResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node name for logging
    pub name: String,

    /// Data directory
    pub data_dir: PathBuf,

    /// API configuration
    pub api: ApiConfig,

    /// Voting engine configuration
    pub engine: EngineConfig,

    /// Logging level
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "relayvote-node".to_string(),
            data_dir: PathBuf::from("./data"),
            api: ApiConfig::default(),
            engine: EngineConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> RelayVoteResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RelayVoteError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> RelayVoteResult<Self> {
        serde_json::from_str(json).map_err(|e| RelayVoteError::ConfigError(e.to_string()))
    }
}

/// Voting engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Proposal life used when genesis does not set one
    pub default_proposal_life: u64,

    /// Interval between height increments in milliseconds
    pub block_time_ms: u64,

    /// Persist state under `data_dir` instead of keeping it in memory
    pub persistent: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_proposal_life: 600,
            block_time_ms: 1000,
            persistent: false,
        }
    }
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Enable HTTP API
    pub enabled: bool,

    /// API listen address
    pub listen_addr: String,

    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "127.0.0.1:8080".to_string(),
            enable_cors: true,
        }
    }
}
