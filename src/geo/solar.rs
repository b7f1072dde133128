//! Astronomical sunrise/sunset computation with polar day/night detection.
//!
//! Regular days take their instants from the `sunrise` crate (standard
//! sunrise equation, −0.833° apparent altitude for refraction and the solar
//! disc). The crate has no notion of "the sun never sets", so each date is
//! first classified with the hour-angle cosine of the same equation:
//!
//! ```text
//! cos ω₀ = (sin(−0.833°) − sin φ · sin δ) / (cos φ · cos δ)
//! ```
//!
//! `cos ω₀ < −1` means the sun stays above the horizon all day, `cos ω₀ > 1`
//! means it never rises.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use sunrise::{Coordinates, SolarDay, SolarEvent};
use tzf_rs::DefaultFinder;

use crate::error::{SolarError, SolarResult};

static TZ_FINDER: Lazy<DefaultFinder> = Lazy::new(DefaultFinder::new);

// Apparent altitude of the sun's upper limb at sunrise/sunset
const SUNRISE_ALTITUDE_DEG: f64 = -0.833;
const EARTH_OBLIQUITY_DEG: f64 = 23.4397;
const PERIHELION_ARGUMENT_DEG: f64 = 102.9372;

/// Outcome of the sunrise equation for one local date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolarDayEvents {
    /// The sun rises and sets.
    Regular {
        sunrise: DateTime<Utc>,
        sunset: DateTime<Utc>,
    },
    /// The sun stays above the horizon for the whole date.
    PolarDay,
    /// The sun stays below the horizon for the whole date.
    PolarNight,
}

impl SolarDayEvents {
    pub fn sunrise(&self) -> Option<DateTime<Utc>> {
        match self {
            SolarDayEvents::Regular { sunrise, .. } => Some(*sunrise),
            _ => None,
        }
    }

    pub fn sunset(&self) -> Option<DateTime<Utc>> {
        match self {
            SolarDayEvents::Regular { sunset, .. } => Some(*sunset),
            _ => None,
        }
    }
}

/// Reject non-finite or out-of-range coordinates.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> SolarResult<()> {
    let valid = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);

    if valid {
        Ok(())
    } else {
        Err(SolarError::InvalidCoordinates {
            latitude,
            longitude,
        })
    }
}

/// Look up the IANA timezone that contains the given coordinates.
///
/// Falls back to UTC for open ocean or names `chrono-tz` does not know.
pub fn determine_timezone_from_coordinates(latitude: f64, longitude: f64) -> Tz {
    let tz_name = TZ_FINDER.get_tz_name(longitude, latitude);
    tz_name.parse::<Tz>().unwrap_or(Tz::UTC)
}

/// Compute the solar events for `date` at the given coordinates.
pub fn solar_day_events(latitude: f64, longitude: f64, date: NaiveDate) -> SolarResult<SolarDayEvents> {
    validate_coordinates(latitude, longitude)?;

    let cos_omega = sunrise_hour_angle_cosine(latitude, longitude, date);
    if let Some(polar) = classify_polar(cos_omega) {
        return Ok(polar);
    }

    let coord = Coordinates::new(latitude, longitude).ok_or(SolarError::InvalidCoordinates {
        latitude,
        longitude,
    })?;
    let solar_day = SolarDay::new(coord, date);
    let sunrise = truncate_to_second(solar_day.event_time(SolarEvent::Sunrise));
    let sunset = truncate_to_second(solar_day.event_time(SolarEvent::Sunset));

    // Right at the polar boundary the two formulations can disagree by a hair;
    // anything the crate returns outside a sane window is treated as polar.
    let window_start = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc() - Duration::days(1));
    let window_end = window_start.map(|start| start + Duration::days(3));
    let in_window = |instant: DateTime<Utc>| match (window_start, window_end) {
        (Some(start), Some(end)) => instant >= start && instant <= end,
        _ => false,
    };

    if sunrise < sunset && in_window(sunrise) && in_window(sunset) {
        Ok(SolarDayEvents::Regular { sunrise, sunset })
    } else if numerator_sign(latitude, longitude, date) < 0.0 {
        Ok(SolarDayEvents::PolarDay)
    } else {
        Ok(SolarDayEvents::PolarNight)
    }
}

fn classify_polar(cos_omega: f64) -> Option<SolarDayEvents> {
    if cos_omega < -1.0 {
        Some(SolarDayEvents::PolarDay)
    } else if cos_omega > 1.0 {
        Some(SolarDayEvents::PolarNight)
    } else {
        None
    }
}

/// Hour-angle cosine of the sunrise equation for `date`.
///
/// At the geographic poles `cos φ` vanishes and the ratio diverges; the sign
/// of the numerator alone then decides day versus night.
pub(crate) fn sunrise_hour_angle_cosine(latitude: f64, longitude: f64, date: NaiveDate) -> f64 {
    let (numerator, denominator) = hour_angle_terms(latitude, longitude, date);
    if denominator.abs() < 1e-12 {
        if numerator < 0.0 {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    } else {
        numerator / denominator
    }
}

fn numerator_sign(latitude: f64, longitude: f64, date: NaiveDate) -> f64 {
    hour_angle_terms(latitude, longitude, date).0
}

fn hour_angle_terms(latitude: f64, longitude: f64, date: NaiveDate) -> (f64, f64) {
    let declination = solar_declination(longitude, date);
    let phi = latitude.to_radians();

    let numerator = SUNRISE_ALTITUDE_DEG.to_radians().sin() - phi.sin() * declination.sin();
    let denominator = phi.cos() * declination.cos();
    (numerator, denominator)
}

/// Solar declination (radians) at local mean noon of `date`.
fn solar_declination(longitude: f64, date: NaiveDate) -> f64 {
    let days_since_j2000 = NaiveDate::from_ymd_opt(2000, 1, 1)
        .map(|epoch| (date - epoch).num_days() as f64)
        .unwrap_or(0.0)
        + 0.0008;
    let mean_solar_time = days_since_j2000 - longitude / 360.0;

    let mean_anomaly = (357.5291 + 0.985_600_28 * mean_solar_time).rem_euclid(360.0);
    let m = mean_anomaly.to_radians();
    let center = 1.9148 * m.sin() + 0.02 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin();
    let ecliptic_longitude =
        (mean_anomaly + center + 180.0 + PERIHELION_ARGUMENT_DEG).rem_euclid(360.0);

    let sin_declination =
        ecliptic_longitude.to_radians().sin() * EARTH_OBLIQUITY_DEG.to_radians().sin();
    sin_declination.asin()
}

fn truncate_to_second(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(instant.timestamp(), 0).unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::test_constants::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_coordinates_bounds() {
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(validate_coordinates(-90.0, -180.0).is_ok());
        assert!(validate_coordinates(90.0001, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.5).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
        assert!(validate_coordinates(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_regular_day_ordering() {
        let events = solar_day_events(TEST_SHANGHAI_LAT, TEST_SHANGHAI_LON, date(2024, 6, 21)).unwrap();
        match events {
            SolarDayEvents::Regular { sunrise, sunset } => {
                assert!(sunrise < sunset);
                assert!((sunset - sunrise).num_hours() >= 14);
            }
            other => panic!("expected a regular day, got {other:?}"),
        }
    }

    #[test]
    fn test_polar_classification_tromso() {
        assert_eq!(
            solar_day_events(TEST_TROMSO_LAT, TEST_TROMSO_LON, date(2024, 6, 21)).unwrap(),
            SolarDayEvents::PolarDay
        );
        assert_eq!(
            solar_day_events(TEST_TROMSO_LAT, TEST_TROMSO_LON, date(2024, 12, 21)).unwrap(),
            SolarDayEvents::PolarNight
        );
    }

    #[test]
    fn test_poles_classify_without_dividing_by_zero() {
        assert_eq!(solar_day_events(90.0, 0.0, date(2024, 6, 21)).unwrap(), SolarDayEvents::PolarDay);
        assert_eq!(
            solar_day_events(-90.0, 0.0, date(2024, 6, 21)).unwrap(),
            SolarDayEvents::PolarNight
        );
    }

    #[test]
    fn test_equator_day_is_about_twelve_hours() {
        let events = solar_day_events(0.0, 0.0, date(2024, 3, 20)).unwrap();
        let (sunrise, sunset) = (events.sunrise().unwrap(), events.sunset().unwrap());
        let hours = (sunset - sunrise).num_minutes() as f64 / 60.0;
        assert!((hours - 12.1).abs() < 0.2, "equinox day length was {hours}");
    }

    #[test]
    fn test_timezone_lookup() {
        assert_eq!(
            determine_timezone_from_coordinates(TEST_SHANGHAI_LAT, TEST_SHANGHAI_LON),
            chrono_tz::Asia::Shanghai
        );
        assert_eq!(
            determine_timezone_from_coordinates(TEST_TROMSO_LAT, TEST_TROMSO_LON),
            chrono_tz::Europe::Oslo
        );
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        let err = solar_day_events(123.0, 0.0, date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, SolarError::InvalidCoordinates { .. }));
    }
}
