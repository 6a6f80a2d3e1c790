//! Engine configuration, read from TOML.
//!
//! ```toml
//! [replay]
//! policy = "lenient"
//! batch_size = 500
//! snapshot_interval = 10000
//!
//! [store]
//! directory = "./snapshots"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the replayer does when simulated amounts differ from the recorded
/// ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayPolicy {
    /// Stop at the first mismatch without applying the event.
    #[default]
    Strict,
    /// Log, apply the event anyway and keep going.
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub policy: ReplayPolicy,
    pub batch_size: usize,
    /// Take a snapshot every N applied events.
    pub snapshot_interval: Option<u64>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            policy: ReplayPolicy::Strict,
            batch_size: 1000,
            snapshot_interval: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub directory: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("snapshots"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub replay: ReplayConfig,
    pub store: StoreConfig,
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replay.batch_size == 0 {
            return Err(ConfigError::Parse("replay.batch_size must be positive".into()));
        }
        if self.replay.snapshot_interval == Some(0) {
            return Err(ConfigError::Parse(
                "replay.snapshot_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}
