//! Configuration loading functionality.
//!
//! Handles locating `duskswitch.toml`, creating a default one on first use,
//! parsing and validating it.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::Config;
use super::validation::validate_config;
use crate::constants::{APP_NAME, CONFIG_FILE_NAME};

// `--config <dir>`, recorded before the first load
static CONFIG_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Record the `--config` directory (`None` for the XDG default).
///
/// Fails on a second call; the directory cannot change once chosen.
pub fn set_config_dir(dir: Option<String>) -> Result<()> {
    CONFIG_DIR
        .set(dir.map(PathBuf::from))
        .map_err(|_| anyhow::anyhow!("Config directory was already chosen for this process"))
}

/// The `--config` directory, if one was given.
pub fn get_custom_config_dir() -> Option<PathBuf> {
    CONFIG_DIR.get().cloned().flatten()
}

/// Path of `duskswitch.toml`, honoring `--config`.
pub fn get_config_path() -> Result<PathBuf> {
    let base = match get_custom_config_dir() {
        Some(dir) => dir,
        None => dirs::config_dir()
            .context("Could not determine the user config directory")?
            .join(APP_NAME),
    };
    Ok(base.join(CONFIG_FILE_NAME))
}

/// Load `duskswitch.toml`, writing the commented default first if it is missing.
pub fn load() -> Result<Config> {
    let path = get_config_path()?;

    if !path.exists() {
        super::builder::create_default_config(&path)
            .with_context(|| format!("Failed to write default config to {}", path.display()))?;
    }

    load_from_path(&path).with_context(|| format!("Invalid configuration in {}", path.display()))
}

/// Parse and validate the file at `path`. A missing file is an error here.
pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("No configuration file at {}", path.display());
    }

    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Config =
        toml::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}
