//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod session;
pub mod track;

use std::path::{Path, PathBuf};

use frota_core::FrotaConfig;
use tracing::debug;

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("frota")
        .join("config.json")
}

pub fn default_session_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("frota")
        .join("session.json")
}

/// Config file in effect: `--config` if given, else the default location.
pub fn config_file(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path)
}

/// Load configuration.
///
/// An explicit `--config` must exist; the default file is optional.
pub fn load_config(config_path: Option<&Path>) -> anyhow::Result<FrotaConfig> {
    if let Some(path) = config_path {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(FrotaConfig::from_file(path)?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading config from {}", path.display());
        Ok(FrotaConfig::from_file(&path)?)
    } else {
        Ok(FrotaConfig::default())
    }
}
