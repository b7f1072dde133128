//! The persisted solar settings record.

use serde::{Deserialize, Serialize};

use crate::constants::MAXIMUM_SUNSET_OFFSET_MINUTES;
use crate::geo::GeoLocation;

/// Location, automation switch and sunset offset.
///
/// Invariant: `auto_theme_enabled` implies `location.is_some()`, and
/// `sunset_offset_minutes` stays within `0..=720`. The store only produces
/// records that satisfy both; [`SolarSettings::sanitize`] repairs records
/// read back from disk that do not.
///
/// Field order matters for TOML output: plain values first, the optional
/// `[location]` table last.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SolarSettings {
    #[serde(default)]
    pub auto_theme_enabled: bool,
    #[serde(default)]
    pub sunset_offset_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
}

impl SolarSettings {
    /// Whether the scheduler should be driving the theme.
    pub fn automation_active(&self) -> bool {
        self.auto_theme_enabled && self.location.is_some()
    }

    /// Repair a record that violates its invariants.
    ///
    /// Returns the repaired record and one message per repair, for the caller
    /// to log.
    pub fn sanitize(mut self) -> (Self, Vec<String>) {
        let mut repairs = Vec::new();

        if let Some(location) = &self.location
            && !location.has_valid_coordinates()
        {
            repairs.push(format!(
                "Saved location '{}' has invalid coordinates ({}, {}), discarding it",
                location.address, location.latitude, location.longitude
            ));
            self.location = None;
        }

        if self.sunset_offset_minutes > MAXIMUM_SUNSET_OFFSET_MINUTES {
            repairs.push(format!(
                "Saved sunset offset {} exceeds {} minutes, resetting to 0",
                self.sunset_offset_minutes, MAXIMUM_SUNSET_OFFSET_MINUTES
            ));
            self.sunset_offset_minutes = 0;
        }

        if self.auto_theme_enabled && self.location.is_none() {
            repairs.push(
                "Automatic theme switching was enabled without a location, disabling it"
                    .to_string(),
            );
            self.auto_theme_enabled = false;
        }

        (self, repairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(latitude: f64) -> GeoLocation {
        GeoLocation {
            address: "Oslo".to_string(),
            display_name: "Oslo, Norge".to_string(),
            latitude,
            longitude: 10.75,
        }
    }

    #[test]
    fn test_defaults() {
        let settings = SolarSettings::default();
        assert!(settings.location.is_none());
        assert!(!settings.auto_theme_enabled);
        assert_eq!(settings.sunset_offset_minutes, 0);
        assert!(!settings.automation_active());
    }

    #[test]
    fn test_sanitize_keeps_valid_record() {
        let settings = SolarSettings {
            auto_theme_enabled: true,
            sunset_offset_minutes: 45,
            location: Some(location(59.91)),
        };
        let (repaired, repairs) = settings.clone().sanitize();
        assert_eq!(repaired, settings);
        assert!(repairs.is_empty());
    }

    #[test]
    fn test_sanitize_repairs_every_violation() {
        let settings = SolarSettings {
            auto_theme_enabled: true,
            sunset_offset_minutes: 900,
            location: Some(location(120.0)),
        };
        let (repaired, repairs) = settings.sanitize();
        assert_eq!(repaired, SolarSettings::default());
        assert_eq!(repairs.len(), 3);
    }

    #[test]
    fn test_toml_round_trip_with_location_table() {
        let settings = SolarSettings {
            auto_theme_enabled: true,
            sunset_offset_minutes: 30,
            location: Some(location(59.91)),
        };
        let text = toml::to_string(&settings).unwrap();
        assert!(text.contains("[location]"));
        let parsed: SolarSettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let parsed: SolarSettings = toml::from_str("sunset_offset_minutes = 10\n").unwrap();
        assert_eq!(parsed.sunset_offset_minutes, 10);
        assert!(!parsed.auto_theme_enabled);
        assert!(parsed.location.is_none());
    }
}
