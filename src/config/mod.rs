//! Configuration system for duskswitch.
//!
//! `duskswitch.toml` holds the knobs a user edits by hand: where geocoding
//! requests go, how long the scheduler waits for the theme applier, how it
//! retries, and the optional hook commands that actually flip the desktop
//! theme. The solar settings themselves (location, automation switch, sunset
//! offset) are program-owned state and live in the state directory instead,
//! see [`crate::state`].
//!
//! ## Configuration Sources
//!
//! 1. `--config <dir>`: `<dir>/duskswitch.toml`
//! 2. `XDG_CONFIG_HOME/duskswitch/duskswitch.toml`
//!
//! A commented default file is written on first use.
//!
//! ## Configuration Structure
//!
//! ```toml
//! #[Geocoding]
//! geocoder_url = "https://nominatim.openstreetmap.org/search"
//! geocode_timeout = 10        # Seconds before a lookup fails (1-60)
//!
//! #[Scheduler]
//! apply_timeout = 5           # Seconds to wait for the theme applier (1-60)
//! retry_interval = 60         # Seconds before retrying a failed apply (5-3600)
//! clock_check_interval = 30   # Seconds between wall clock checks (1-600)
//!
//! #[Hooks]
//! light_command = "gsettings set org.gnome.desktop.interface color-scheme prefer-light"
//! dark_command = "gsettings set org.gnome.desktop.interface color-scheme prefer-dark"
//! ```
//!
//! Every field is optional; missing values fall back to the defaults in
//! [`crate::constants`]. Out-of-range values are rejected at load time.

pub mod builder;
pub mod loading;
pub mod validation;

use serde::Deserialize;

use crate::constants::*;

pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};

/// Settings loaded from `duskswitch.toml`.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Nominatim-compatible search endpoint.
    pub geocoder_url: Option<String>,
    /// Seconds before a geocoding request is abandoned.
    pub geocode_timeout: Option<u64>,

    /// Seconds the scheduler waits for one `set_state` call.
    pub apply_timeout: Option<u64>,
    /// Seconds between a failed apply and the next attempt.
    pub retry_interval: Option<u64>,
    /// Upper bound on how long the scheduler sleeps without reading the clock.
    pub clock_check_interval: Option<u64>,

    /// Shell command run when switching to the light theme.
    pub light_command: Option<String>,
    /// Shell command run when switching to the dark theme.
    pub dark_command: Option<String>,
}

impl Config {
    pub fn geocoder_url(&self) -> &str {
        self.geocoder_url.as_deref().unwrap_or(DEFAULT_GEOCODER_URL)
    }

    pub fn geocode_timeout_secs(&self) -> u64 {
        self.geocode_timeout.unwrap_or(DEFAULT_GEOCODE_TIMEOUT)
    }

    pub fn apply_timeout_secs(&self) -> u64 {
        self.apply_timeout.unwrap_or(DEFAULT_APPLY_TIMEOUT)
    }

    pub fn retry_interval_secs(&self) -> u64 {
        self.retry_interval.unwrap_or(DEFAULT_RETRY_INTERVAL)
    }

    pub fn clock_check_interval_secs(&self) -> u64 {
        self.clock_check_interval
            .unwrap_or(DEFAULT_CLOCK_CHECK_INTERVAL)
    }

    /// Log the effective configuration in the daemon's startup block.
    pub fn log_config(&self) {
        log_block_start!("Loaded configuration");
        log_indented!("Geocoder: {}", self.geocoder_url());
        log_indented!("Geocode timeout: {}s", self.geocode_timeout_secs());
        log_indented!("Apply timeout: {}s", self.apply_timeout_secs());
        log_indented!("Retry interval: {}s", self.retry_interval_secs());
        log_indented!("Clock check interval: {}s", self.clock_check_interval_secs());

        match (&self.light_command, &self.dark_command) {
            (None, None) => log_indented!("Hooks: none (theme is only recorded)"),
            (light, dark) => {
                if let Some(cmd) = light {
                    log_indented!("Light hook: {cmd}");
                }
                if let Some(cmd) = dark {
                    log_indented!("Dark hook: {cmd}");
                }
            }
        }
    }
}
