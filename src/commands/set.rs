//! Settings mutation commands: `location`, `auto` and `offset`.

use anyhow::Result;

use super::status::log_settings;
use crate::args::GlobalOptions;
use crate::constants::MAXIMUM_SUNSET_OFFSET_MINUTES;
use crate::error::SolarError;

pub fn handle_location_command(options: &GlobalOptions, address: &str) -> Result<()> {
    let service = super::open_service(options)?;
    if !options.json {
        log_version!();
        log_block_start!("Looking up \"{}\"...", address.trim());
    }

    super::emit(options, service.save_solar_location(address), |settings| {
        if let Some(location) = &settings.location {
            log_decorated!("Found {}", location.display_name);
        }
        log_settings(settings);
        log_end!();
    })
    .inspect_err(log_lookup_failure)
}

pub fn handle_auto_command(options: &GlobalOptions, enabled: bool) -> Result<()> {
    let service = super::open_service(options)?;

    super::emit(options, service.set_auto_theme_enabled(enabled), |settings| {
        log_version!();
        log_block_start!(
            "Automatic theme switching {}",
            if settings.auto_theme_enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        if settings.auto_theme_enabled {
            log_indented!("A running 'duskswitch run' picks this up immediately");
        }
        log_end!();
    })
    .inspect_err(|e| {
        if e.downcast_ref::<SolarError>() == Some(&SolarError::ConfigurationRequired) {
            log_pipe!();
            log_info!("Save a location first: duskswitch location <address>");
        }
    })
}

pub fn handle_offset_command(options: &GlobalOptions, minutes: i64) -> Result<()> {
    let service = super::open_service(options)?;

    super::emit(options, service.set_sunset_offset_minutes(minutes), |settings| {
        log_version!();
        log_block_start!(
            "Dark theme now starts {} minutes before sunset",
            settings.sunset_offset_minutes
        );
        log_end!();
    })
}

fn log_lookup_failure(error: &anyhow::Error) {
    match error.downcast_ref::<SolarError>() {
        Some(SolarError::NoResults { .. }) => {
            log_pipe!();
            log_info!("Try a more specific address, e.g. including the country");
        }
        Some(SolarError::NetworkError(_)) => {
            log_pipe!();
            log_info!("Check the network connection and geocoder_url in duskswitch.toml");
        }
        _ => {}
    }
}

pub fn display_location_help() {
    log_version!();
    log_block_start!("location - Geocode an address and save it");
    log_block_start!("Usage: duskswitch location <address>");
    log_block_start!("Arguments:");
    log_indented!("<address>  Free text; words are joined with spaces");
    log_block_start!("Examples:");
    log_indented!("duskswitch location Reykjavik");
    log_indented!("duskswitch location 10 Downing Street, London");
    log_end!();
}

pub fn display_auto_help() {
    log_version!();
    log_block_start!("auto - Enable or disable automatic theme switching");
    log_block_start!("Usage: duskswitch auto <on|off>");
    log_indented!("Enabling requires a saved location");
    log_end!();
}

pub fn display_offset_help() {
    log_version!();
    log_block_start!("offset - Start the dark theme before sunset");
    log_block_start!("Usage: duskswitch offset <minutes>");
    log_block_start!("Arguments:");
    log_indented!("<minutes>  0-{MAXIMUM_SUNSET_OFFSET_MINUTES}; sunrise is never shifted");
    log_end!();
}
