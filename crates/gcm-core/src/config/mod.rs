//! Configuration types for gcm.
//!
//! Configuration is loaded from a YAML file (`gcm.yaml`) holding the filter
//! settings inline, plus an optional fixture file used by the CLI to stand in
//! for group storage and the relation registry.
//!
//! ```yaml
//! filter:
//!   argument_name: gid
//!   require_latest_version: true
//! fixture_file: fixture.yaml
//! ```

pub mod filter;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use filter::FilterConfig;

/// Complete gcm configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GcmConfig {
    /// Visibility filter settings.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Path to a fixture file, relative to the config file unless absolute.
    #[serde(default)]
    pub fixture_file: Option<PathBuf>,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GcmConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.filter.validate()?;
        Ok(config)
    }

    /// Load configuration and resolve `fixture_file` against the directory
    /// of the config file.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(fixture_file) = &config.fixture_file {
            if !fixture_file.is_absolute() {
                config.fixture_file = Some(base_dir.join(fixture_file));
            }
        }

        Ok(config)
    }
}
