//! Typed change events broadcast through the [`EventBus`](super::bus::EventBus).

use serde::{Deserialize, Serialize};

use crate::backend::ThemeState;
use crate::error::ErrorPayload;
use crate::state::settings::SolarSettings;

/// All events that can be published.
///
/// Serialized as JSON objects tagged by `event_type`, one per line when
/// streamed by `duskswitch run --json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum StateEvent {
    /// The persisted settings record changed.
    ///
    /// Emitted after every successful mutation, including ones that store an
    /// identical value, and when a reload picks up an external edit.
    SolarSettingsChanged {
        #[serde(flatten)]
        settings: SolarSettings,
    },

    /// Enabling automation was refused because no location is saved.
    AutoThemeConfigurationRequired {
        #[serde(flatten)]
        error: ErrorPayload,
    },

    /// The applier accepted a new theme.
    ThemeStateChanged {
        #[serde(flatten)]
        state: ThemeState,
    },

    /// The scheduler could not apply a theme and will retry.
    ThemeApplyFailed {
        #[serde(flatten)]
        error: ErrorPayload,
    },
}

impl StateEvent {
    pub fn settings_changed(settings: SolarSettings) -> Self {
        StateEvent::SolarSettingsChanged { settings }
    }

    pub fn configuration_required(error: ErrorPayload) -> Self {
        StateEvent::AutoThemeConfigurationRequired { error }
    }

    pub fn theme_changed(state: ThemeState) -> Self {
        StateEvent::ThemeStateChanged { state }
    }

    pub fn apply_failed(error: ErrorPayload) -> Self {
        StateEvent::ThemeApplyFailed { error }
    }

    /// Short name used in log output.
    pub fn name(&self) -> &'static str {
        match self {
            StateEvent::SolarSettingsChanged { .. } => "solar_settings_changed",
            StateEvent::AutoThemeConfigurationRequired { .. } => {
                "auto_theme_configuration_required"
            }
            StateEvent::ThemeStateChanged { .. } => "theme_state_changed",
            StateEvent::ThemeApplyFailed { .. } => "theme_apply_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ThemeMode;
    use crate::error::SolarError;

    #[test]
    fn test_settings_changed_serialization() {
        let settings = SolarSettings {
            auto_theme_enabled: false,
            sunset_offset_minutes: 15,
            location: None,
        };
        let json = serde_json::to_string(&StateEvent::settings_changed(settings)).unwrap();

        assert!(json.contains("\"event_type\":\"solar_settings_changed\""));
        assert!(json.contains("\"sunset_offset_minutes\":15"));
        assert!(json.contains("\"auto_theme_enabled\":false"));
    }

    #[test]
    fn test_theme_state_changed_round_trip() {
        let event = StateEvent::theme_changed(ThemeState::uniform(ThemeMode::Dark));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"theme_state_changed\""));
        assert!(json.contains("\"apps\":\"dark\""));

        let parsed: StateEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_configuration_required_carries_code() {
        let event = StateEvent::configuration_required(SolarError::ConfigurationRequired.to_payload());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"auto_theme_configuration_required\""));
        assert!(json.contains("errors.auto_theme.location_required_for_enable"));
        assert_eq!(event.name(), "auto_theme_configuration_required");
    }
}
