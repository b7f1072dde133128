//! Display and formatting utilities for sun times.
//!
//! Renders a [`SunTimesResult`] as a block of the structured log output used
//! by the `sun` and `status` commands, and by the scheduler in debug mode.

use crate::backend::ThemeMode;
use crate::geo::times::{SolarMode, SunTimesResult, TransitionKind, format_hms};

/// Log a sun-times result as an indented block.
pub fn log_sun_times(result: &SunTimesResult) {
    log_block_start!("Sun times for {}", result.display_name);
    log_indented!("Address: {}", result.address);
    log_indented!(
        "Coordinates: {:.4}°{}, {:.4}°{}",
        result.latitude.abs(),
        if result.latitude >= 0.0 { "N" } else { "S" },
        result.longitude.abs(),
        if result.longitude >= 0.0 { "E" } else { "W" }
    );
    log_indented!("Date: {} ({})", result.date, result.timezone);

    match result.solar_mode {
        SolarMode::Regular => {
            if let (Some(sunrise), Some(sunset)) = (&result.sunrise_local, &result.sunset_local) {
                log_indented!("Sunrise: {sunrise}");
                log_indented!("Sunset:  {sunset}");
            }
            if let Some(effective) = &result.effective_sunset_utc
                && result.sunset_utc.as_deref() != Some(effective.as_str())
            {
                log_indented!("Dark from (UTC): {effective}");
            }
            log_indented!("Day length: {}", result.day_length_hms);
        }
        SolarMode::PolarDay => log_indented!("Polar day: the sun does not set on this date"),
        SolarMode::PolarNight => log_indented!("Polar night: the sun does not rise on this date"),
    }

    log_block_start!(
        "Recommended theme: {}{}",
        theme_label(result.recommended_theme),
        if result.is_daylight { " (daylight)" } else { "" }
    );
    log_indented!(
        "Next {} at {} (in {})",
        transition_label(result.next_transition.kind),
        result.next_transition.local,
        format_hms(result.seconds_until_next_transition)
    );
}

fn theme_label(mode: ThemeMode) -> &'static str {
    match mode {
        ThemeMode::Light => "light 󰖨 ",
        ThemeMode::Dark => "dark  ",
    }
}

fn transition_label(kind: TransitionKind) -> &'static str {
    match kind {
        TransitionKind::Sunrise => "sunrise 󰖜 ",
        TransitionKind::Sunset => "sunset 󰖛 ",
    }
}
