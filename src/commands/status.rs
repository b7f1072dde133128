//! Status command: saved settings, recorded theme and today's sun times.

use anyhow::Result;
use serde::Serialize;

use crate::args::GlobalOptions;
use crate::backend::ThemeState;
use crate::geo::SunTimesResult;
use crate::geo::display::log_sun_times;
use crate::state::SolarSettings;

#[derive(Serialize)]
struct StatusReport {
    settings: SolarSettings,
    theme: Option<ThemeState>,
    sun_times: Option<SunTimesResult>,
}

pub fn handle_status_command(options: &GlobalOptions) -> Result<()> {
    let service = super::open_service(options)?;
    let settings = service.get_solar_settings();

    let theme = match service.get_theme_state() {
        Ok(state) => Some(state),
        Err(e) => {
            log_warning!("{e}");
            None
        }
    };

    // Without a location there is nothing to compute; that is not an error here
    let sun_times = settings
        .location
        .as_ref()
        .map(|_| service.get_sun_times_by_saved_location(None))
        .transpose();

    let report = sun_times.map(|sun_times| StatusReport {
        settings,
        theme,
        sun_times,
    });

    super::emit(options, report, |report| {
        log_version!();
        log_settings(&report.settings);
        if let Some(theme) = report.theme {
            log_indented!("Current theme: apps {}, system {}", theme.apps, theme.system);
        }
        match &report.sun_times {
            Some(result) => log_sun_times(result),
            None => {
                log_pipe!();
                log_info!("No location saved. Set one with: duskswitch location <address>");
            }
        }
        log_end!();
    })
}

/// Log the solar settings as a block.
pub(crate) fn log_settings(settings: &SolarSettings) {
    log_block_start!("Solar settings");
    match &settings.location {
        Some(location) => {
            log_indented!("Location: {}", location.address);
            log_indented!("Resolved: {}", location.display_name);
            log_indented!(
                "Coordinates: {:.4}, {:.4}",
                location.latitude,
                location.longitude
            );
        }
        None => log_indented!("Location: not set"),
    }
    log_indented!(
        "Automatic switching: {}",
        if settings.auto_theme_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    log_indented!("Sunset offset: {} min", settings.sunset_offset_minutes);
}

pub fn display_help() {
    log_version!();
    log_block_start!("status - Show settings, current theme and today's sun times");
    log_block_start!("Usage: duskswitch status [--json]");
    log_block_start!("Options:");
    log_indented!("-j, --json  Print a single JSON object instead");
    log_end!();
}
