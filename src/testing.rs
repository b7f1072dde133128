//! Test doubles for the external collaborators.
//!
//! Available to unit tests and, through the `testing-support` feature, to the
//! integration tests under `tests/`.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::backend::{ThemeApplier, ThemeMode, ThemeState};
use crate::error::{SolarError, SolarResult};
use crate::geo::{GeoLocation, Geocoder};

/// Applier that remembers every state it was asked to apply.
pub struct RecordingApplier {
    applied: Mutex<Vec<ThemeState>>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl RecordingApplier {
    pub fn new() -> Self {
        Self {
            applied: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            delay: None,
        }
    }

    /// Every `set_state` fails until [`set_failing(false)`](Self::set_failing).
    pub fn failing() -> Self {
        let applier = Self::new();
        applier.set_failing(true);
        applier
    }

    /// Every `set_state` blocks for `delay` before succeeding.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// States successfully applied, oldest first.
    pub fn applied(&self) -> Vec<ThemeState> {
        self.applied
            .lock()
            .map(|applied| applied.clone())
            .unwrap_or_default()
    }
}

impl Default for RecordingApplier {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeApplier for RecordingApplier {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn get_state(&self) -> Result<ThemeState> {
        Ok(self
            .applied()
            .last()
            .copied()
            .unwrap_or(ThemeState::uniform(ThemeMode::Light)))
    }

    fn set_state(&self, state: ThemeState) -> Result<ThemeState> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("simulated applier failure");
        }
        if let Ok(mut applied) = self.applied.lock() {
            applied.push(state);
        }
        Ok(state)
    }
}

/// Geocoder answering from a fixed table.
#[derive(Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeoLocation>,
    lookups: AtomicUsize,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: &str, latitude: f64, longitude: f64) -> Self {
        self.entries.insert(
            address.to_string(),
            GeoLocation {
                address: address.to_string(),
                display_name: format!("{address} (resolved)"),
                latitude,
                longitude,
            },
        );
        self
    }

    /// Number of lookups answered so far, hits and misses alike.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Geocoder for StaticGeocoder {
    fn lookup(&self, address: &str) -> SolarResult<GeoLocation> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.entries
            .get(address.trim())
            .cloned()
            .ok_or_else(|| SolarError::NoResults {
                address: address.trim().to_string(),
            })
    }
}
