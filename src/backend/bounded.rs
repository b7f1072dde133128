//! Time-limited access to a [`ThemeApplier`].
//!
//! The scheduler and manual theme changes share one [`BoundedApplier`], so
//! at most one `set_state` call is ever running against the desktop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use crate::backend::{ThemeApplier, ThemeState};
use crate::error::{SolarError, SolarResult};

#[derive(Clone)]
pub struct BoundedApplier {
    applier: Arc<dyn ThemeApplier>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

impl BoundedApplier {
    pub fn new(applier: Arc<dyn ThemeApplier>, timeout: Duration) -> Self {
        Self {
            applier,
            timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.applier.name()
    }

    pub fn get_state(&self) -> SolarResult<ThemeState> {
        self.applier
            .get_state()
            .map_err(|e| SolarError::ThemeReadFailed(format!("{e:#}")))
    }

    /// Call `set_state` on a worker thread and wait at most `timeout`.
    ///
    /// A timed-out call keeps running in its worker; until it returns, further
    /// applies are refused rather than stacked.
    pub fn apply(&self, state: ThemeState) -> SolarResult<ThemeState> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(SolarError::ThemeApplyFailed(format!(
                "previous {} apply is still running",
                self.applier.name()
            )));
        }

        let (tx, rx) = mpsc::channel();
        let applier = Arc::clone(&self.applier);
        let in_flight = Arc::clone(&self.in_flight);
        let spawned = std::thread::Builder::new()
            .name("theme-apply".to_string())
            .spawn(move || {
                let result = applier.set_state(state);
                in_flight.store(false, Ordering::SeqCst);
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            self.in_flight.store(false, Ordering::SeqCst);
            return Err(SolarError::ThemeApplyFailed(format!(
                "failed to spawn apply thread: {e}"
            )));
        }

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(applied)) => Ok(applied),
            Ok(Err(e)) => Err(SolarError::ThemeApplyFailed(format!("{e:#}"))),
            Err(RecvTimeoutError::Timeout) => Err(SolarError::ThemeApplyFailed(format!(
                "{} applier did not respond within {}s",
                self.applier.name(),
                self.timeout.as_secs_f64()
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(SolarError::ThemeApplyFailed(
                "apply thread exited without a result".to_string(),
            )),
        }
    }
}
