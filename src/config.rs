//! Engine configuration, read from JSON by hosts that do not build it in code.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Cannot read config '{path}': {message}")]
    Io { path: String, message: String },
    #[error("Invalid config: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Ceiling on nested `calculate` frames. Catches formulas that recurse through an
    /// endless chain of distinct periods, which never repeat a key. The default stays
    /// well inside a 2 MiB thread stack, the size of rayon workers and test threads.
    pub max_depth: usize,
    /// Record which keys each computation requested, for traces and topology queries.
    pub record_dependencies: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_depth: 200, record_dependencies: true }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }
}
