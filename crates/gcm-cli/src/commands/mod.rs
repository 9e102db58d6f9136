//! CLI command implementations.

pub mod check;
pub mod explain;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use gcm_core::{Fixture, GcmConfig};

/// Load the config file when given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<GcmConfig> {
    match path {
        Some(path) => GcmConfig::load_with_context(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(GcmConfig::default()),
    }
}

/// The fixture named on the command line, else the one from the config.
pub fn resolve_fixture_path(explicit: Option<&Path>, config: &GcmConfig) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.fixture_file.clone())
}

pub fn load_fixture(path: &Path) -> Result<Fixture> {
    Fixture::from_file(path).with_context(|| format!("failed to load fixture {}", path.display()))
}
