//! Default configuration file generation.
//!
//! The generated file lists every setting with its default value and a
//! comment aligned to a common column. Hook commands are written commented
//! out, since there is no desktop-independent default for them.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::constants::*;

/// Write a commented default `duskswitch.toml` to `path`.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let content = default_config_content();
    fs::write(path, content)
        .with_context(|| format!("Failed to write default config to {}", path.display()))?;

    log_block_start!("Created default configuration: {}", path.display());
    Ok(())
}

pub(crate) fn default_config_content() -> String {
    let mut content = ConfigBuilder::new()
        .add_section("Geocoding")
        .add_setting(
            "geocoder_url",
            &format!("\"{DEFAULT_GEOCODER_URL}\""),
            "Nominatim-compatible search endpoint",
        )
        .add_setting(
            "geocode_timeout",
            &DEFAULT_GEOCODE_TIMEOUT.to_string(),
            &format!(
                "Seconds before a lookup fails ({MINIMUM_GEOCODE_TIMEOUT}-{MAXIMUM_GEOCODE_TIMEOUT})"
            ),
        )
        .add_section("Scheduler")
        .add_setting(
            "apply_timeout",
            &DEFAULT_APPLY_TIMEOUT.to_string(),
            &format!(
                "Seconds to wait for the theme hook ({MINIMUM_APPLY_TIMEOUT}-{MAXIMUM_APPLY_TIMEOUT})"
            ),
        )
        .add_setting(
            "retry_interval",
            &DEFAULT_RETRY_INTERVAL.to_string(),
            &format!(
                "Seconds before retrying a failed switch ({MINIMUM_RETRY_INTERVAL}-{MAXIMUM_RETRY_INTERVAL})"
            ),
        )
        .add_setting(
            "clock_check_interval",
            &DEFAULT_CLOCK_CHECK_INTERVAL.to_string(),
            &format!(
                "Seconds between wall clock checks ({MINIMUM_CLOCK_CHECK_INTERVAL}-{MAXIMUM_CLOCK_CHECK_INTERVAL})"
            ),
        )
        .build();

    content.push_str(
        "\n\n#[Hooks]\n\
         # Run through the shell with DUSKSWITCH_APPS_THEME and DUSKSWITCH_SYSTEM_THEME set.\n\
         # light_command = \"gsettings set org.gnome.desktop.interface color-scheme prefer-light\"\n\
         # dark_command = \"gsettings set org.gnome.desktop.interface color-scheme prefer-dark\"\n",
    );
    content
}

/// Builder for formatted configuration files.
///
/// Pads every setting line to the widest one so comments line up, whatever
/// the default values in constants.rs happen to be.
struct ConfigBuilder {
    entries: Vec<Entry>,
}

enum Entry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(Entry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(Entry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Setting { line, .. } => Some(line.len()),
                Entry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        for entry in self.entries {
            match entry {
                Entry::Section(title) => {
                    if !result.is_empty() {
                        result.push(String::new());
                    }
                    result.push(title);
                }
                Entry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        result.join("\n")
    }
}
