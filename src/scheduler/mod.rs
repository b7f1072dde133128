//! Automatic theme scheduling.
//!
//! [`ThemeScheduler`] is the state machine; [`spawn`] runs it on a named
//! driver thread that listens to the [`EventBus`] for settings changes and
//! polls the wall clock in bounded chunks so that suspend/resume and clock
//! jumps are noticed within one `clock_check_interval`.

pub mod machine;
pub mod wake;

pub use machine::{SchedulerConfig, SchedulerState, ThemeScheduler};
pub use wake::{ScheduledWake, WakeReason, WakeSlot};

use anyhow::{Context, Result};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::state::{EventBus, SolarSettings, StateEvent, Subscription};

/// Running scheduler. Dropping it stops the driver thread.
pub struct SchedulerHandle {
    bus: EventBus,
    subscription_id: u64,
    status: Arc<Mutex<SchedulerState>>,
    handle: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Current phase of the scheduler.
    pub fn state(&self) -> SchedulerState {
        match self.status.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Unsubscribe the driver from the bus and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.bus.unsubscribe(self.subscription_id);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the driver thread.
///
/// `subscription` must have been taken from `bus` before `initial` was read,
/// so that no settings change can fall between the two.
pub fn spawn(
    mut scheduler: ThemeScheduler,
    bus: EventBus,
    subscription: Subscription,
    initial: SolarSettings,
) -> Result<SchedulerHandle> {
    let status = scheduler.status_handle();
    let Subscription { id, receiver } = subscription;

    let handle = std::thread::Builder::new()
        .name("theme-scheduler".to_string())
        .spawn(move || {
            scheduler.settings_changed(initial);

            loop {
                match receiver.recv_timeout(scheduler.wait_duration()) {
                    Ok(StateEvent::SolarSettingsChanged { settings }) => {
                        scheduler.settings_changed(settings);
                    }
                    Ok(_) => {}
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                scheduler.fire_if_due();
            }

            #[cfg(debug_assertions)]
            eprintln!("DEBUG: Scheduler driver exiting");
        })
        .context("Failed to spawn scheduler thread")?;

    Ok(SchedulerHandle {
        bus,
        subscription_id: id,
        status,
        handle: Some(handle),
    })
}
