//! Domain error taxonomy surfaced to callers of the public operations.
//!
//! Infrastructure code (config loading, persistence plumbing, CLI dispatch)
//! uses `anyhow` with context. The operations exposed by [`crate::Duskswitch`]
//! return [`SolarError`] so callers can branch on the failure kind, and every
//! variant maps to an [`ErrorPayload`] with a stable dotted code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Failures of the solar settings and sun-time operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SolarError {
    #[error("address must not be empty")]
    InvalidAddress,

    #[error("no geocoding result for \"{address}\"")]
    NoResults { address: String },

    #[error("geocoding request failed: {0}")]
    NetworkError(String),

    #[error("coordinates out of range: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("sunset offset must be between 0 and {max} minutes, got {minutes}")]
    InvalidOffset { minutes: i64, max: u32 },

    #[error("a saved location is required before enabling automatic theme switching")]
    ConfigurationRequired,

    #[error("no saved location to compute sun times for")]
    NoSavedLocation,

    #[error("theme could not be applied: {0}")]
    ThemeApplyFailed(String),

    #[error("current theme could not be read: {0}")]
    ThemeReadFailed(String),

    #[error("invalid date \"{value}\", expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("location request for \"{address}\" was superseded by a newer request")]
    LocationRequestSuperseded { address: String },

    #[error("settings storage failed: {0}")]
    Storage(String),

    #[error("solar calculation failed: {0}")]
    Calculation(String),
}

impl SolarError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            SolarError::InvalidAddress => "errors.address.empty",
            SolarError::NoResults { .. } => "errors.geocode.not_found",
            SolarError::NetworkError(_) => "errors.network.request_failed",
            SolarError::InvalidCoordinates { .. } => "errors.solar.invalid_coordinates",
            SolarError::InvalidOffset { .. } => "errors.solar.invalid_offset",
            SolarError::ConfigurationRequired => "errors.auto_theme.location_required_for_enable",
            SolarError::NoSavedLocation => "errors.solar.location_required_for_query",
            SolarError::ThemeApplyFailed(_) => "errors.auto_theme.apply_failed",
            SolarError::ThemeReadFailed(_) => "errors.theme.read_failed",
            SolarError::InvalidDate { .. } => "errors.date.invalid_format",
            SolarError::LocationRequestSuperseded { .. } => "errors.solar.location_superseded",
            SolarError::Storage(_) => "errors.storage.write_failed",
            SolarError::Calculation(_) => "errors.date.calculation_failed",
        }
    }

    /// Convert into the serializable payload carried by events and `--json` output.
    pub fn to_payload(&self) -> ErrorPayload {
        let payload = ErrorPayload::new(self.code(), self.to_string());
        match self {
            SolarError::NoResults { address } | SolarError::LocationRequestSuperseded { address } => {
                payload.with_param("address", address)
            }
            SolarError::NetworkError(source)
            | SolarError::ThemeApplyFailed(source)
            | SolarError::ThemeReadFailed(source)
            | SolarError::Storage(source)
            | SolarError::Calculation(source) => payload.with_param("source", source),
            SolarError::InvalidCoordinates {
                latitude,
                longitude,
            } => payload
                .with_param("latitude", latitude)
                .with_param("longitude", longitude),
            SolarError::InvalidOffset { minutes, max } => payload
                .with_param("minutes", minutes)
                .with_param("max", max),
            SolarError::InvalidDate { value } => payload
                .with_param("value", value)
                .with_param("format", "YYYY-MM-DD"),
            SolarError::InvalidAddress
            | SolarError::ConfigurationRequired
            | SolarError::NoSavedLocation => payload,
        }
    }
}

/// Serializable error description with a stable code and string parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl ErrorPayload {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }
}

impl From<&SolarError> for ErrorPayload {
    fn from(error: &SolarError) -> Self {
        error.to_payload()
    }
}

pub type SolarResult<T> = std::result::Result<T, SolarError>;
