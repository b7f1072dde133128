//! Applier that records the theme to a file and runs user hook commands.
//!
//! The hook for the target theme runs through the platform shell with two
//! environment variables describing the requested state:
//!
//! - `DUSKSWITCH_APPS_THEME` (`light` or `dark`)
//! - `DUSKSWITCH_SYSTEM_THEME` (`light` or `dark`)
//!
//! A hook that exits non-zero fails the apply and the recorded state is left
//! as it was, so the scheduler retries. Without hooks the applier only
//! records, which is enough for other tools to read `theme_state.json`.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{ThemeApplier, ThemeMode, ThemeState};

pub const APPS_THEME_ENV: &str = "DUSKSWITCH_APPS_THEME";
pub const SYSTEM_THEME_ENV: &str = "DUSKSWITCH_SYSTEM_THEME";

pub struct CommandApplier {
    state_path: PathBuf,
    light_command: Option<String>,
    dark_command: Option<String>,
    debug_enabled: bool,
}

impl CommandApplier {
    pub fn new(
        state_path: PathBuf,
        light_command: Option<String>,
        dark_command: Option<String>,
        debug_enabled: bool,
    ) -> Result<Self> {
        if let Some(dir) = state_path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory {}", dir.display()))?;
        }

        Ok(Self {
            state_path,
            light_command: non_blank(light_command),
            dark_command: non_blank(dark_command),
            debug_enabled,
        })
    }

    /// Path of the recorded state file.
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    fn command_for(&self, mode: ThemeMode) -> Option<&str> {
        match mode {
            ThemeMode::Light => self.light_command.as_deref(),
            ThemeMode::Dark => self.dark_command.as_deref(),
        }
    }

    fn run_hook(&self, command: &str, state: ThemeState) -> Result<()> {
        if self.debug_enabled {
            log_debug!("Running hook: {command}");
        }

        let output = shell(command)
            .env(APPS_THEME_ENV, state.apps.as_str())
            .env(SYSTEM_THEME_ENV, state.system.as_str())
            .output()
            .with_context(|| format!("Failed to start hook command '{command}'"))?;

        if self.debug_enabled {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
                log_indented!("{line}");
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            anyhow::bail!(
                "Hook command '{command}' exited with {}{}",
                output.status,
                if detail.is_empty() {
                    String::new()
                } else {
                    format!(": {detail}")
                }
            );
        }

        Ok(())
    }

    fn record(&self, state: ThemeState) -> Result<()> {
        let dir = self
            .state_path
            .parent()
            .context("Theme state path has no parent directory")?;
        let json = serde_json::to_string_pretty(&state).context("Failed to serialize theme state")?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        temp.write_all(json.as_bytes())
            .context("Failed to write theme state")?;
        temp.persist(&self.state_path)
            .with_context(|| format!("Failed to replace {}", self.state_path.display()))?;
        Ok(())
    }
}

impl ThemeApplier for CommandApplier {
    fn name(&self) -> &'static str {
        "command"
    }

    fn get_state(&self) -> Result<ThemeState> {
        if !self.state_path.exists() {
            return Ok(ThemeState::uniform(ThemeMode::Light));
        }

        let content = fs::read_to_string(&self.state_path)
            .with_context(|| format!("Failed to read {}", self.state_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.state_path.display()))
    }

    fn set_state(&self, state: ThemeState) -> Result<ThemeState> {
        // Both facets follow the apps theme when choosing which hook to run
        if let Some(command) = self.command_for(state.apps) {
            self.run_hook(command, state)?;
        }
        self.record(state)?;
        Ok(state)
    }
}

fn non_blank(command: Option<String>) -> Option<String> {
    command.filter(|c| !c.trim().is_empty())
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
