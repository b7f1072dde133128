//! Theme applier abstraction for the OS-level light/dark switch.
//!
//! The scheduler never touches the desktop directly. It hands the theme it
//! wants to a [`ThemeApplier`], which reports the state it ended up in. The
//! shipped [`command::CommandApplier`] remembers the last applied state in
//! the state directory and runs user-configured hook commands, which is how
//! a desktop-specific switch (gsettings, a registry write, a compositor
//! IPC call) gets plugged in.
//!
//! ## Contract
//!
//! - `get_state` reports the current `{apps, system}` pair.
//! - `set_state` applies the pair and returns what is now in effect. Applying
//!   a state that is already active is a no-op from the caller's point of view.
//! - Implementations may block. Writes go through a [`BoundedApplier`], which
//!   caps every call at `apply_timeout` and treats a timeout like any other
//!   failure.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;

pub mod bounded;
pub mod command;

pub use bounded::BoundedApplier;
pub use command::CommandApplier;

/// One facet of the desktop theme.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Theme of application windows and of the system shell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThemeState {
    pub apps: ThemeMode,
    pub system: ThemeMode,
}

impl ThemeState {
    /// Both facets set to the same mode, which is what automation applies.
    pub fn uniform(mode: ThemeMode) -> Self {
        Self {
            apps: mode,
            system: mode,
        }
    }
}

/// External collaborator that reads and writes the desktop theme.
pub trait ThemeApplier: Send + Sync {
    /// Human-readable name used in log output.
    fn name(&self) -> &'static str;

    /// Read the theme currently in effect.
    fn get_state(&self) -> Result<ThemeState>;

    /// Apply `state` and return the state now in effect.
    fn set_state(&self, state: ThemeState) -> Result<ThemeState>;
}

/// Build the applier described by the configuration.
///
/// # Arguments
/// * `config` - Supplies the optional light/dark hook commands
/// * `state_dir` - Directory holding `theme_state.json`
/// * `debug_enabled` - Whether hook output should be logged
pub fn create_applier(
    config: &Config,
    state_dir: &Path,
    debug_enabled: bool,
) -> Result<Arc<dyn ThemeApplier>> {
    let applier = CommandApplier::new(
        state_dir.join(crate::constants::THEME_STATE_FILE_NAME),
        config.light_command.clone(),
        config.dark_command.clone(),
        debug_enabled,
    )?;

    if debug_enabled && config.light_command.is_none() && config.dark_command.is_none() {
        log_debug!("No light_command/dark_command configured, theme changes are only recorded");
    }

    Ok(Arc::new(applier))
}
