//! Configuration loading
//!
//! Handles parsing of `todoflow.toml`. Every field has a default, so a missing
//! file is equivalent to an empty one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "todoflow.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where todos are persisted. Selected once at boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Single slot in a local key-value store; no login.
    #[default]
    Local,
    /// Owner-scoped rows in a hosted table; requires a signed-in user.
    Remote,
}

/// Which failed mutations are compensated by re-reading the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackPolicy {
    /// Only reorder rolls back; other operations keep their optimistic state.
    #[default]
    ReorderOnly,
    /// Every mutating operation rolls back on failure.
    AllMutations,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendKind,

    /// JSON file backing the local key-value store
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    #[serde(default)]
    pub rollback: RollbackPolicy,

    /// `tracing` filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            data_file: default_data_file(),
            rollback: RollbackPolicy::default(),
            log_filter: default_log_filter(),
        }
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("todoflow.json")
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Load configuration, or return defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_file must not be empty".into()));
        }
        Ok(())
    }
}
