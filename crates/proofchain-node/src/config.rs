//! Node configuration.
//!
//! Loaded from a YAML file (every field optional), then overridden from the
//! command line and validated once before the node starts.

use crate::observability::LogFormat;
use crate::schema::RecordSchema;
use proofchain_consensus::{
    ChainValidator, PeerAddress, ProofOfWork, DEFAULT_DIFFICULTY, DEFAULT_PEER_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for a proofchain node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// HTTP listen address.
    pub api_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Leading hex zeros a proof must produce. Shared by the whole network.
    pub difficulty: u8,
    /// Check block indices and the genesis sentinel when validating peer chains.
    pub strict_index: bool,
    /// Record shape accepted by `POST /transactions/new`.
    pub record_schema: RecordSchema,
    /// Peers registered at startup.
    pub peers: Vec<String>,
    /// Bound on a single peer chain fetch, in milliseconds.
    pub peer_timeout_ms: u64,
    /// Seconds between automatic resolution rounds. 0 disables them.
    pub resolve_interval_secs: u64,
    /// Path peers serve their chain on.
    pub peer_chain_path: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            difficulty: DEFAULT_DIFFICULTY,
            strict_index: true,
            record_schema: RecordSchema::Transfer,
            peers: Vec::new(),
            peer_timeout_ms: DEFAULT_PEER_TIMEOUT.as_millis() as u64,
            resolve_interval_secs: 0,
            peer_chain_path: "/chain".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl NodeConfig {
    /// Loads configuration from a YAML file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_yaml(&content)
    }

    /// Parses configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document parses as null rather than an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=64).contains(&self.difficulty) {
            return Err(ConfigError::Invalid(format!(
                "difficulty must be between 1 and 64, got {}",
                self.difficulty
            )));
        }
        if !self.peer_chain_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "peer_chain_path must start with '/', got {:?}",
                self.peer_chain_path
            )));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.log_level
            )));
        }
        if self.peer_timeout_ms == 0 {
            return Err(ConfigError::Invalid("peer_timeout_ms must be positive".into()));
        }
        for peer in &self.peers {
            PeerAddress::parse(peer).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }

    /// Returns the proof-of-work predicate.
    pub fn pow(&self) -> ProofOfWork {
        ProofOfWork::new(self.difficulty)
    }

    /// Returns the validator applied to peer chains.
    pub fn validator(&self) -> ChainValidator {
        ChainValidator::new(self.pow()).with_strict_index(self.strict_index)
    }

    /// Returns the bound on a single peer fetch.
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    /// Returns the period of automatic resolution, if enabled.
    pub fn resolve_interval(&self) -> Option<Duration> {
        (self.resolve_interval_secs > 0).then(|| Duration::from_secs(self.resolve_interval_secs))
    }
}
