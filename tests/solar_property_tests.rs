use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;

use duskswitch::backend::ThemeMode;
use duskswitch::constants::{
    LOCAL_DATETIME_FORMAT, MAXIMUM_SUNSET_OFFSET_MINUTES, SECONDS_PER_DAY,
};
use duskswitch::geo::solar::solar_day_events;
use duskswitch::geo::times::format_hms;
use duskswitch::geo::{
    GeoLocation, SolarDayEvents, SolarMode, compute_sun_times,
    determine_timezone_from_coordinates,
};

/// Generate valid latitude values
fn latitude_strategy() -> impl Strategy<Value = f64> {
    -90.0..=90.0
}

/// Generate valid longitude values
fn longitude_strategy() -> impl Strategy<Value = f64> {
    -180.0..=180.0
}

/// Instants between 2000-01-01 and 2100-01-01
fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (946_684_800i64..4_102_444_800i64)
        .prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap_or_default())
}

fn location(lat: f64, lon: f64) -> GeoLocation {
    GeoLocation {
        address: "somewhere".to_string(),
        display_name: "Somewhere".to_string(),
        latitude: lat,
        longitude: lon,
    }
}

fn local_date(lat: f64, lon: f64, now: DateTime<Utc>) -> NaiveDate {
    let tz = determine_timezone_from_coordinates(lat, lon);
    now.with_timezone(&tz).date_naive()
}

/// Property tests for timezone detection functionality
#[cfg(test)]
mod timezone_detection_tests {
    use super::*;

    proptest! {
        /// Any valid coordinate maps to some timezone without panicking
        #[test]
        fn test_valid_coordinates_return_timezone(
            lat in latitude_strategy(),
            lon in longitude_strategy()
        ) {
            let tz = determine_timezone_from_coordinates(lat, lon);
            prop_assert!(!tz.name().is_empty());
        }

        /// Known cities resolve to their IANA zone
        #[test]
        fn test_major_cities_timezones(
            city_index in 0..8usize
        ) {
            let cities = [
                (40.7128, -74.0060, "America/New_York"),
                (51.5074, -0.1278, "Europe/London"),
                (35.6762, 139.6503, "Asia/Tokyo"),
                (-33.8688, 151.2093, "Australia/Sydney"),
                (31.2304, 121.4737, "Asia/Shanghai"),
                (64.1466, -21.9426, "Atlantic/Reykjavik"),
                (69.6492, 18.9553, "Europe/Oslo"),
                (-23.5505, -46.6333, "America/Sao_Paulo"),
            ];

            let (lat, lon, expected_tz_str) = cities[city_index];
            let expected = expected_tz_str.parse::<Tz>().unwrap();
            prop_assert_eq!(determine_timezone_from_coordinates(lat, lon), expected);
        }
    }
}

/// Property tests for the sun time calculation
#[cfg(test)]
mod sun_time_tests {
    use super::*;

    proptest! {
        /// Sunrise precedes sunset and the day length is their difference
        #[test]
        fn test_regular_day_ordering(
            lat in -60.0..60.0,
            lon in longitude_strategy(),
            now in instant_strategy()
        ) {
            let date = local_date(lat, lon, now);
            let result = compute_sun_times(&location(lat, lon), date, now, 0).unwrap();

            prop_assert_eq!(result.solar_mode, SolarMode::Regular);
            let sunrise = result.sunrise_unix.unwrap();
            let sunset = result.sunset_unix.unwrap();
            prop_assert!(sunrise < sunset, "sunrise {} not before sunset {}", sunrise, sunset);
            prop_assert_eq!(result.day_length_seconds, sunset - sunrise);
            prop_assert!((0..SECONDS_PER_DAY).contains(&result.day_length_seconds));
            prop_assert_eq!(result.day_length_hms, format_hms(result.day_length_seconds));
        }

        /// The next transition is in the future and the countdown matches it
        #[test]
        fn test_next_transition_is_after_now(
            lat in -85.0..85.0,
            lon in longitude_strategy(),
            now in instant_strategy(),
            offset in 0..=MAXIMUM_SUNSET_OFFSET_MINUTES
        ) {
            let date = local_date(lat, lon, now);
            let result = compute_sun_times(&location(lat, lon), date, now, offset).unwrap();

            prop_assert!(result.next_transition.at > now);
            prop_assert!(result.seconds_until_next_transition >= 0);
            prop_assert_eq!(
                result.seconds_until_next_transition,
                (result.next_transition.at - now).num_seconds()
            );
        }

        /// The current theme is always the one the next transition switches away from
        #[test]
        fn test_current_theme_opposes_next_transition(
            lat in -60.0..60.0,
            lon in longitude_strategy(),
            now in instant_strategy()
        ) {
            let date = local_date(lat, lon, now);
            let result = compute_sun_times(&location(lat, lon), date, now, 0).unwrap();

            prop_assert_ne!(
                result.recommended_theme,
                result.next_transition.kind.theme_after()
            );
            prop_assert_eq!(
                result.is_daylight,
                result.recommended_theme == ThemeMode::Light
            );
        }

        /// The sunset offset moves the effective sunset and never the sunrise
        #[test]
        fn test_offset_never_shifts_sunrise(
            lat in -60.0..60.0,
            lon in longitude_strategy(),
            now in instant_strategy(),
            offset in 1..=MAXIMUM_SUNSET_OFFSET_MINUTES
        ) {
            let date = local_date(lat, lon, now);
            let plain = compute_sun_times(&location(lat, lon), date, now, 0).unwrap();
            let shifted = compute_sun_times(&location(lat, lon), date, now, offset).unwrap();

            prop_assert_eq!(&plain.sunrise_utc, &shifted.sunrise_utc);
            prop_assert_eq!(&plain.sunset_utc, &shifted.sunset_utc);
            prop_assert_eq!(plain.day_length_seconds, shifted.day_length_seconds);
            prop_assert_eq!(plain.is_daylight, shifted.is_daylight);

            let sunset = DateTime::from_timestamp(plain.sunset_unix.unwrap(), 0).unwrap();
            let expected = (sunset - Duration::minutes(i64::from(offset)))
                .format(LOCAL_DATETIME_FORMAT)
                .to_string();
            prop_assert_eq!(shifted.effective_sunset_utc, Some(expected));
        }

        /// An offset can only turn light into dark, never the reverse
        #[test]
        fn test_offset_only_darkens(
            lat in -60.0..60.0,
            lon in longitude_strategy(),
            now in instant_strategy(),
            offset in 1..=MAXIMUM_SUNSET_OFFSET_MINUTES
        ) {
            let date = local_date(lat, lon, now);
            let plain = compute_sun_times(&location(lat, lon), date, now, 0).unwrap();
            let shifted = compute_sun_times(&location(lat, lon), date, now, offset).unwrap();

            if plain.recommended_theme == ThemeMode::Dark {
                prop_assert_eq!(shifted.recommended_theme, ThemeMode::Dark);
            }
        }

        /// Very high latitudes classify every date without failing
        #[test]
        fn test_extreme_latitude_handling(
            extreme_lat in prop_oneof![70.0..=90.0, -90.0..=-70.0],
            lon in longitude_strategy(),
            day_of_year in 0..365i64
        ) {
            let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day_of_year);
            let events = solar_day_events(extreme_lat, lon, date);

            prop_assert!(events.is_ok(), "latitude {} failed on {}", extreme_lat, date);
            if let Ok(SolarDayEvents::Regular { sunrise, sunset }) = events {
                prop_assert!(sunrise < sunset);
            }
        }
    }
}

#[test]
fn test_polar_day_and_night_at_june_solstice() {
    let now = DateTime::parse_from_rfc3339("2024-06-21T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();

    let north = compute_sun_times(&location(78.2232, 15.6267), date, now, 0).unwrap();
    assert_eq!(north.solar_mode, SolarMode::PolarDay);
    assert_eq!(north.day_length_seconds, SECONDS_PER_DAY);
    assert_eq!(north.day_length_hms, "24:00:00");
    assert!(north.is_daylight);
    assert_eq!(north.recommended_theme, ThemeMode::Light);
    assert!(north.sunrise_utc.is_none() && north.sunset_utc.is_none());

    let south = compute_sun_times(&location(-77.8460, 166.6760), date, now, 0).unwrap();
    assert_eq!(south.solar_mode, SolarMode::PolarNight);
    assert_eq!(south.day_length_seconds, 0);
    assert_eq!(south.day_length_hms, "00:00:00");
    assert!(!south.is_daylight);
    assert_eq!(south.recommended_theme, ThemeMode::Dark);
    assert!(south.next_transition.at > now);
}
