//! Clock abstraction for real and manually driven time.
//!
//! The scheduler and the sun-time queries never call `Utc::now()` directly;
//! they ask an injected [`TimeSource`]. Production code uses
//! [`RealTimeSource`], tests drive a [`ManualTimeSource`] to jump across
//! transitions (including jumps that model a suspended machine) without
//! waiting for real time to pass.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::{Arc, Mutex};

/// Trait for abstracting "what time is it now".
pub trait TimeSource: Send + Sync {
    /// Get the current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Whether this source is driven by hand rather than the system clock.
    fn is_simulated(&self) -> bool {
        false
    }
}

/// System wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualTimeSource {
    current: Mutex<DateTime<Utc>>,
}

impl ManualTimeSource {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Jump to an absolute instant, forwards or backwards.
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = instant;
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: ChronoDuration) {
        if let Ok(mut guard) = self.current.lock() {
            *guard += delta;
        }
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        match self.current.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

/// Shared handle used across the scheduler thread and request handlers.
pub type SharedTimeSource = Arc<dyn TimeSource>;

/// Convenience constructor for the production clock.
pub fn system_clock() -> SharedTimeSource {
    Arc::new(RealTimeSource)
}
