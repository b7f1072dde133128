//! `theme` command: show the current theme or switch it by hand.

use anyhow::Result;

use crate::args::{GlobalOptions, ThemeTarget};
use crate::backend::{ThemeMode, ThemeState};

pub fn handle_theme_command(options: &GlobalOptions, target: Option<ThemeTarget>) -> Result<()> {
    let service = super::open_service(options)?;

    let Some(target) = target else {
        return super::emit(options, service.get_theme_state(), |state| {
            log_version!();
            log_block_start!("Current theme: apps {}, system {}", state.apps, state.system);
            log_end!();
        });
    };

    let wanted = match target {
        ThemeTarget::Light => Ok(ThemeState::uniform(ThemeMode::Light)),
        ThemeTarget::Dark => Ok(ThemeState::uniform(ThemeMode::Dark)),
        ThemeTarget::Toggle => service.get_theme_state().map(toggled),
    };
    let result = wanted.and_then(|state| service.set_theme_state(state));
    let automation_active = service.get_solar_settings().automation_active();

    super::emit(options, result, |state| {
        log_version!();
        log_block_start!("Switched to the {} theme", state.apps);
        if automation_active {
            log_indented!("Automatic switching is on; the next sunrise or sunset overrides this");
        }
        log_end!();
    })
}

/// Opposite of the application theme, applied to both facets.
fn toggled(current: ThemeState) -> ThemeState {
    ThemeState::uniform(match current.apps {
        ThemeMode::Light => ThemeMode::Dark,
        ThemeMode::Dark => ThemeMode::Light,
    })
}

pub fn display_help() {
    log_version!();
    log_block_start!("theme - Show or switch the current theme");
    log_block_start!("Usage: duskswitch theme [light|dark|toggle]");
    log_block_start!("Arguments:");
    log_indented!("light, dark  Apply this theme to apps and system");
    log_indented!("toggle       Switch to the opposite of the current app theme");
    log_indented!("(none)       Print the current theme");
    log_block_start!("With automatic switching on, the next transition overrides a manual choice");
    log_end!();
}
