//! Reactor configuration
//!
//! Handles parsing and management of `rclspin.toml` files.

use crate::qos::QosProfile;
use crate::reactor::DEFAULT_SPIN_TIMEOUT;
use crate::transport::{LoopbackConfig, Timeout};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// File name searched for by [`ReactorConfig::find_and_load`].
pub const CONFIG_FILE_NAME: &str = "rclspin.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching `rclspin.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReactorConfig {
    /// Spin loop settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Profile for endpoints created without an explicit one
    #[serde(default)]
    pub qos: QosProfile,

    /// In-process transport limits
    #[serde(default)]
    pub loopback: LoopbackConfig,
}

impl ReactorConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: ReactorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir()?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    ///
    /// Falls back to defaults when no file is found.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Spin loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Wait timeout of each cycle run by `spin`. Zero polls, negative blocks.
    #[serde(default = "default_spin_timeout_ms")]
    pub spin_timeout_ms: i64,
}

fn default_spin_timeout_ms() -> i64 {
    DEFAULT_SPIN_TIMEOUT.as_millis() as i64
}

impl ExecutorConfig {
    pub fn spin_timeout(&self) -> Timeout {
        Timeout::from_millis(self.spin_timeout_ms)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            spin_timeout_ms: default_spin_timeout_ms(),
        }
    }
}

impl From<Duration> for ExecutorConfig {
    fn from(timeout: Duration) -> Self {
        Self {
            spin_timeout_ms: i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX),
        }
    }
}
