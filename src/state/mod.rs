//! Persistent solar settings and change notification, following XDG Base
//! Directory standards.
//!
//! Configuration (`duskswitch.toml`) is hand-edited and read-only to the
//! program. Everything the program itself writes lives under
//! `XDG_STATE_HOME/duskswitch/{namespace}`:
//!
//! - `settings.toml`: the single [`SolarSettings`] record
//! - `settings.lock`: cross-process write lock for that record
//! - `theme_state.json`: last theme applied by the command applier
//!
//! ## Module Structure
//!
//! - [`settings`]: the record and its load-time repair
//! - [`store`]: serialized mutations with persistence and events
//! - [`events`]: typed change events
//! - [`bus`]: subscribe/unsubscribe registry that fans events out
//! - [`watcher`]: picks up edits made by other processes

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::constants::APP_NAME;

pub mod bus;
pub mod events;
pub mod settings;
pub mod store;
pub mod watcher;

pub use bus::{EventBus, Subscription};
pub use events::StateEvent;
pub use settings::SolarSettings;
pub use store::{FileSettingsBackend, MemorySettingsBackend, SettingsBackend, SettingsStore};

/// Get the state directory for a given configuration directory.
///
/// State is stored in XDG_STATE_HOME/duskswitch/{namespace} where namespace is:
/// - "default" for the default config directory
/// - "custom_<hash>" for custom config directories (via --config)
pub fn get_state_dir(config_dir: Option<&Path>) -> Result<PathBuf> {
    let state_home = std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".local/state")
        });

    let state_base = state_home.join(APP_NAME);

    let namespace = match config_dir {
        None => "default".to_string(),
        Some(path) => {
            let default_config = dirs::config_dir()
                .context("Could not determine config directory")?
                .join(APP_NAME);
            if path == default_config {
                "default".to_string()
            } else {
                get_state_namespace(path)
            }
        }
    };

    Ok(state_base.join(namespace))
}

/// Generate a stable namespace for a custom config directory.
fn get_state_namespace(config_path: &Path) -> String {
    let canonical = config_path
        .canonicalize()
        .unwrap_or_else(|_| config_path.to_path_buf());

    // SHA256 truncated to 16 chars is stable across runs and unique enough
    let hash = sha256::digest(canonical.to_string_lossy().as_bytes());
    format!("custom_{}", &hash[..16])
}

/// Resolve the state directory for the active config dir and make sure it exists.
pub fn ensure_state_dir() -> Result<PathBuf> {
    let config_dir = crate::config::get_custom_config_dir();
    let state_dir = get_state_dir(config_dir.as_deref())?;
    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("Failed to create state directory {}", state_dir.display()))?;
    Ok(state_dir)
}
