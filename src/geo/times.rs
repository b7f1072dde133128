//! Sun times for a location with full timezone context.
//!
//! [`compute_sun_times`] turns a location, a date in the location's civil
//! calendar and the current instant into a [`SunTimesResult`]: the day's
//! sunrise and sunset, the recommended theme at `now`, and the next instant
//! at which the recommendation can change. All `*_local` renderings use the
//! timezone of the coordinates, not the timezone of the machine.
//!
//! # Sunset offset
//! The offset is subtracted from sunset only. The effective daylight window
//! is `[sunrise, sunset − offset)`; sunrise is never shifted.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::backend::ThemeMode;
use crate::constants::{
    DATE_FORMAT, LOCAL_DATETIME_FORMAT, NEXT_TRANSITION_SEARCH_DAYS, SECONDS_PER_DAY,
};
use crate::error::{SolarError, SolarResult};
use crate::geo::GeoLocation;
use crate::geo::solar::{
    SolarDayEvents, determine_timezone_from_coordinates, solar_day_events, validate_coordinates,
};

/// Whether the sun rises and sets on the computed date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SolarMode {
    Regular,
    PolarDay,
    PolarNight,
}

/// Which boundary the next transition crosses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Sunrise,
    Sunset,
}

impl TransitionKind {
    /// Theme in effect once this transition has passed.
    pub fn theme_after(&self) -> ThemeMode {
        match self {
            TransitionKind::Sunrise => ThemeMode::Light,
            TransitionKind::Sunset => ThemeMode::Dark,
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionKind::Sunrise => f.write_str("sunrise"),
            TransitionKind::Sunset => f.write_str("sunset"),
        }
    }
}

/// The soonest sunrise or effective sunset strictly after `now`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NextTransition {
    pub kind: TransitionKind,
    pub at: DateTime<Utc>,
    pub utc: String,
    pub local: String,
}

/// Everything a caller needs to know about the sun at a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SunTimesResult {
    pub address: String,
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
    pub timezone: String,
    pub solar_mode: SolarMode,
    pub sunrise_utc: Option<String>,
    pub sunset_utc: Option<String>,
    pub sunrise_local: Option<String>,
    pub sunset_local: Option<String>,
    pub sunrise_unix: Option<i64>,
    pub sunset_unix: Option<i64>,
    pub effective_sunset_utc: Option<String>,
    pub day_length_seconds: i64,
    pub day_length_hms: String,
    pub is_daylight: bool,
    pub recommended_theme: ThemeMode,
    pub next_transition: NextTransition,
    pub seconds_until_next_transition: i64,
}

/// Compute the sun times for `location` on `date` as seen at `now`.
///
/// `date` is a date in the location's own civil calendar. When it is the
/// location's current date, `is_daylight` and `recommended_theme` come from
/// the latest transition at or before `now`, so a sunset that falls after
/// local midnight still counts as daylight until it happens. For any other
/// date they are evaluated against that date's events. The next transition
/// is always searched relative to `now`.
pub fn compute_sun_times(
    location: &GeoLocation,
    date: NaiveDate,
    now: DateTime<Utc>,
    sunset_offset_minutes: u32,
) -> SolarResult<SunTimesResult> {
    let (lat, lon) = (location.latitude, location.longitude);
    validate_coordinates(lat, lon)?;

    let tz = determine_timezone_from_coordinates(lat, lon);
    let offset = Duration::minutes(i64::from(sunset_offset_minutes));
    let events = solar_day_events(lat, lon, date)?;

    let (solar_mode, day_length_seconds) = match events {
        SolarDayEvents::Regular { sunrise, sunset } => {
            (SolarMode::Regular, (sunset - sunrise).num_seconds())
        }
        SolarDayEvents::PolarDay => (SolarMode::PolarDay, SECONDS_PER_DAY),
        SolarDayEvents::PolarNight => (SolarMode::PolarNight, 0),
    };

    let (is_daylight, recommended_theme) = if date == now.with_timezone(&tz).date_naive() {
        let (raw, _) = find_previous_transition(lat, lon, tz, now, Duration::zero())?;
        let (effective, _) = find_previous_transition(lat, lon, tz, now, offset)?;
        (raw == TransitionKind::Sunrise, effective.theme_after())
    } else {
        state_on_date(events, now, offset)
    };

    let (kind, next_at) = find_next_transition(lat, lon, tz, now, offset)?;
    let seconds_until_next_transition = (next_at - now).num_seconds().max(0);

    let sunrise = events.sunrise();
    let sunset = events.sunset();

    Ok(SunTimesResult {
        address: location.address.clone(),
        display_name: location.display_name.clone(),
        latitude: lat,
        longitude: lon,
        date: date.format(DATE_FORMAT).to_string(),
        timezone: tz.name().to_string(),
        solar_mode,
        sunrise_utc: sunrise.map(format_utc),
        sunset_utc: sunset.map(format_utc),
        sunrise_local: sunrise.map(|t| format_local(t, tz)),
        sunset_local: sunset.map(|t| format_local(t, tz)),
        sunrise_unix: sunrise.map(|t| t.timestamp()),
        sunset_unix: sunset.map(|t| t.timestamp()),
        effective_sunset_utc: sunset.map(|t| format_utc(t - offset)),
        day_length_seconds,
        day_length_hms: format_hms(day_length_seconds),
        is_daylight,
        recommended_theme,
        next_transition: NextTransition {
            kind,
            at: next_at,
            utc: format_utc(next_at),
            local: format_local(next_at, tz),
        },
        seconds_until_next_transition,
    })
}

/// Find the soonest sunrise or effective sunset strictly after `now`.
///
/// Starts one day before the local date of `now` so that an effective sunset
/// shifted across midnight is still seen. Polar spans are skipped over.
fn find_next_transition(
    lat: f64,
    lon: f64,
    tz: Tz,
    now: DateTime<Utc>,
    offset: Duration,
) -> SolarResult<(TransitionKind, DateTime<Utc>)> {
    let start = now.with_timezone(&tz).date_naive() - Duration::days(1);

    let mut best: Option<(TransitionKind, DateTime<Utc>)> = None;
    let mut previous = solar_day_events(lat, lon, start - Duration::days(1))?;
    let mut days_after_hit = 0;

    for day_index in 0..=NEXT_TRANSITION_SEARCH_DAYS {
        let day = start + Duration::days(day_index);
        let events = solar_day_events(lat, lon, day)?;

        for (kind, at) in day_transitions(previous, events, day, tz, offset, false) {
            if at > now && best.is_none_or(|(_, best_at)| at < best_at) {
                best = Some((kind, at));
            }
        }

        // A large offset can pull the effective sunset ahead of the same
        // day's sunrise, so keep looking a little past the first hit.
        if best.is_some() {
            days_after_hit += 1;
            if days_after_hit > 2 {
                break;
            }
        }
        previous = events;
    }

    best.ok_or_else(|| no_transition_error(now))
}

/// Find the latest sunrise or effective sunset at or before `now`.
///
/// Walks backwards from the day after the local date of `now`. A day whose
/// effective sunset does not come after its sunrise never turns light, so
/// its sunrise is ignored here.
fn find_previous_transition(
    lat: f64,
    lon: f64,
    tz: Tz,
    now: DateTime<Utc>,
    offset: Duration,
) -> SolarResult<(TransitionKind, DateTime<Utc>)> {
    let start = now.with_timezone(&tz).date_naive() + Duration::days(1);

    let mut best: Option<(TransitionKind, DateTime<Utc>)> = None;
    let mut events = solar_day_events(lat, lon, start)?;
    let mut days_after_hit = 0;

    for day_index in 0..=NEXT_TRANSITION_SEARCH_DAYS {
        let day = start - Duration::days(day_index);
        let earlier = solar_day_events(lat, lon, day - Duration::days(1))?;

        for (kind, at) in day_transitions(earlier, events, day, tz, offset, true) {
            if at <= now && best.is_none_or(|(_, best_at)| at > best_at) {
                best = Some((kind, at));
            }
        }

        if best.is_some() {
            days_after_hit += 1;
            if days_after_hit > 2 {
                break;
            }
        }
        events = earlier;
    }

    best.ok_or_else(|| no_transition_error(now))
}

/// Transitions belonging to `day`, given the events of the day before it.
///
/// The first day of polar day counts as a sunrise at its local midnight, or
/// at the previous day's sunset if that comes later, and the first regular
/// day after it only has a sunset. A direct switch from polar day to polar
/// night (only near the poles) counts as a sunset at local midnight.
fn day_transitions(
    previous: SolarDayEvents,
    events: SolarDayEvents,
    day: NaiveDate,
    tz: Tz,
    offset: Duration,
    skip_empty_window: bool,
) -> Vec<(TransitionKind, DateTime<Utc>)> {
    match (previous, events) {
        (previous, SolarDayEvents::Regular { sunrise, sunset }) => {
            let effective_sunset = sunset - offset;
            // Coming out of polar day it is light already
            let after_polar_day = previous == SolarDayEvents::PolarDay;
            let empty_window = skip_empty_window && effective_sunset <= sunrise;

            let mut transitions = Vec::with_capacity(2);
            if !after_polar_day && !empty_window {
                transitions.push((TransitionKind::Sunrise, sunrise));
            }
            transitions.push((TransitionKind::Sunset, effective_sunset));
            transitions
        }
        (SolarDayEvents::PolarDay, SolarDayEvents::PolarNight) => {
            vec![(TransitionKind::Sunset, local_midnight(day, tz))]
        }
        (before, SolarDayEvents::PolarDay) if before != SolarDayEvents::PolarDay => {
            let midnight = local_midnight(day, tz);
            let at = before.sunset().map_or(midnight, |sunset| sunset.max(midnight));
            vec![(TransitionKind::Sunrise, at)]
        }
        _ => Vec::new(),
    }
}

/// Daylight and theme judged against a single date's events.
fn state_on_date(
    events: SolarDayEvents,
    now: DateTime<Utc>,
    offset: Duration,
) -> (bool, ThemeMode) {
    match events {
        SolarDayEvents::Regular { sunrise, sunset } => {
            let theme = if now >= sunrise && now < sunset - offset {
                ThemeMode::Light
            } else {
                ThemeMode::Dark
            };
            (now >= sunrise && now < sunset, theme)
        }
        SolarDayEvents::PolarDay => (true, ThemeMode::Light),
        SolarDayEvents::PolarNight => (false, ThemeMode::Dark),
    }
}

fn no_transition_error(now: DateTime<Utc>) -> SolarError {
    SolarError::Calculation(format!(
        "no sunrise or sunset within {NEXT_TRANSITION_SEARCH_DAYS} days of {}",
        now.format(DATE_FORMAT)
    ))
}

fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// Parse an optional `YYYY-MM-DD` date; absent or blank means today in `tz`.
pub fn resolve_target_date(date: Option<&str>, tz: Tz, now: DateTime<Utc>) -> SolarResult<NaiveDate> {
    match date.map(str::trim) {
        Some(value) if !value.is_empty() => NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map_err(|_| SolarError::InvalidDate {
                value: value.to_string(),
            }),
        _ => Ok(now.with_timezone(&tz).date_naive()),
    }
}

/// Format a duration in seconds as `HH:MM:SS`, clamping negatives to zero.
pub fn format_hms(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

fn format_utc(instant: DateTime<Utc>) -> String {
    instant.format(LOCAL_DATETIME_FORMAT).to_string()
}

fn format_local(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(LOCAL_DATETIME_FORMAT).to_string()
}
