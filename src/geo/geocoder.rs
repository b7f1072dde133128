//! Address lookup collaborators.
//!
//! [`Geocoder`] turns user-typed address text into a [`GeoLocation`]. The
//! crate ships two implementations:
//!
//! - [`NominatimGeocoder`]: one blocking HTTP request per lookup against an
//!   OpenStreetMap Nominatim search endpoint, bounded by a timeout, never
//!   retried, and spaced at least one second apart as the public instance's
//!   usage policy requires.
//! - [`CachingGeocoder`]: wraps another geocoder and remembers successful
//!   answers per exact (trimmed) address for the life of the process, so a
//!   "look up" followed by "save" on the same text costs one request.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::constants::{GEOCODER_MIN_REQUEST_INTERVAL_MS, GEOCODER_USER_AGENT};
use crate::error::{SolarError, SolarResult};
use crate::geo::GeoLocation;
use crate::geo::solar::validate_coordinates;

/// Resolve address text to coordinates and a canonical display name.
#[cfg_attr(test, mockall::automock)]
pub trait Geocoder: Send + Sync {
    /// Look up `address`.
    ///
    /// # Errors
    /// - `InvalidAddress` if the text is empty or whitespace
    /// - `NoResults` if nothing matches
    /// - `NetworkError` on transport failure, timeout, or a malformed reply
    fn lookup(&self, address: &str) -> SolarResult<GeoLocation>;
}

/// Trim the address, rejecting empty input.
pub fn normalize_address(address: &str) -> SolarResult<&str> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        Err(SolarError::InvalidAddress)
    } else {
        Ok(trimmed)
    }
}

#[derive(Debug, Deserialize)]
struct NominatimItem {
    lat: String,
    lon: String,
    display_name: String,
}

/// Geocoder backed by a Nominatim `/search` endpoint.
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    search_url: String,
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl NominatimGeocoder {
    /// Build a client for `search_url` with the given request timeout.
    pub fn new(search_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(GEOCODER_USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            search_url: search_url.into(),
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(GEOCODER_MIN_REQUEST_INTERVAL_MS),
        })
    }

    // Holding the lock across the sleep queues concurrent callers behind it
    fn wait_for_rate_limit(&self) {
        let mut guard = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(last) = *guard {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }

        *guard = Some(Instant::now());
    }
}

impl Geocoder for NominatimGeocoder {
    fn lookup(&self, address: &str) -> SolarResult<GeoLocation> {
        let trimmed = normalize_address(address)?;

        self.wait_for_rate_limit();

        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("q", trimmed),
                ("format", "jsonv2"),
                ("limit", "1"),
                ("addressdetails", "0"),
            ])
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    SolarError::NetworkError(format!("request timed out: {e}"))
                } else {
                    SolarError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SolarError::NetworkError(format!(
                "geocoder returned HTTP {status}"
            )));
        }

        let items: Vec<NominatimItem> = response
            .json()
            .map_err(|e| SolarError::NetworkError(format!("malformed geocoder response: {e}")))?;

        let first = items.into_iter().next().ok_or_else(|| SolarError::NoResults {
            address: trimmed.to_string(),
        })?;

        parse_item(trimmed, first)
    }
}

fn parse_item(address: &str, item: NominatimItem) -> SolarResult<GeoLocation> {
    let latitude = item.lat.trim().parse::<f64>().map_err(|e| {
        SolarError::NetworkError(format!("unparseable latitude \"{}\": {e}", item.lat))
    })?;
    let longitude = item.lon.trim().parse::<f64>().map_err(|e| {
        SolarError::NetworkError(format!("unparseable longitude \"{}\": {e}", item.lon))
    })?;
    validate_coordinates(latitude, longitude)?;

    Ok(GeoLocation {
        address: address.to_string(),
        display_name: item.display_name,
        latitude,
        longitude,
    })
}

/// Session cache in front of another geocoder.
///
/// Only successes are cached; a failed lookup is attempted again next time.
pub struct CachingGeocoder {
    inner: Arc<dyn Geocoder>,
    cache: Mutex<HashMap<String, GeoLocation>>,
}

impl CachingGeocoder {
    pub fn new(inner: Arc<dyn Geocoder>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &str) -> Option<GeoLocation> {
        self.cache.lock().ok().and_then(|cache| cache.get(key).cloned())
    }
}

impl Geocoder for CachingGeocoder {
    fn lookup(&self, address: &str) -> SolarResult<GeoLocation> {
        let trimmed = normalize_address(address)?;

        if let Some(hit) = self.cached(trimmed) {
            return Ok(hit);
        }

        // The lock is not held during the lookup; two racing misses both
        // query the inner geocoder and the later answer wins the slot.
        let location = self.inner.lookup(trimmed)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(trimmed.to_string(), location.clone());
        }
        Ok(location)
    }
}
