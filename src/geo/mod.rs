//! Geographic location and sunrise/sunset calculations.
//!
//! ## Module Structure
//!
//! - [`solar`]: Astronomical sunrise/sunset with polar day/night classification
//! - [`times`]: Full [`SunTimesResult`] for a location, date and instant
//! - [`geocoder`]: Address lookup collaborators (Nominatim over HTTP, session cache)
//! - [`display`]: Block-structured log rendering of sun times
//!
//! Everything in [`solar`] and [`times`] is a pure function of its inputs; the
//! current instant is always passed in so the scheduler and the tests decide
//! what "now" means.

pub mod display;
pub mod geocoder;
pub mod solar;
pub mod times;

use serde::{Deserialize, Serialize};

pub use geocoder::{CachingGeocoder, Geocoder, NominatimGeocoder};
pub use solar::{SolarDayEvents, determine_timezone_from_coordinates, validate_coordinates};
pub use times::{
    NextTransition, SolarMode, SunTimesResult, TransitionKind, compute_sun_times,
    resolve_target_date,
};


/// A resolved address.
///
/// `address` is the text the user typed (trimmed), `display_name` the
/// canonical name the geocoder returned for it. Replaced wholesale whenever
/// the address is resolved again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoLocation {
    pub address: String,
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    /// Whether the coordinates are finite and inside the valid ranges.
    pub fn has_valid_coordinates(&self) -> bool {
        validate_coordinates(self.latitude, self.longitude).is_ok()
    }
}
