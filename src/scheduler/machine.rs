//! Theme scheduling state machine.
//!
//! ```text
//!            settings: auto off / no location
//!   ┌──────────────────────────────────────────┐
//!   ▼                                          │
//! Idle ──settings: auto on──► Transitioning ──►Armed(wake)
//!                                  ▲               │
//!                                  └──wake due─────┘
//! ```
//!
//! A transition pass always recomputes from the clock's current instant. A
//! machine that slept through one or more transitions therefore applies the
//! theme for the time it actually woke at, once, and arms the next upcoming
//! transition. Nothing is replayed.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backend::{BoundedApplier, ThemeState};
use crate::config::Config;
use crate::constants::MIN_RECHECK_DELAY_SECS;
use crate::geo::display::log_sun_times;
use crate::geo::{compute_sun_times, determine_timezone_from_coordinates};
use crate::scheduler::wake::{ScheduledWake, WakeReason, WakeSlot};
use crate::state::{EventBus, SolarSettings, StateEvent};
use crate::time_source::SharedTimeSource;

/// Observable phase of the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerState {
    Idle,
    Armed(ScheduledWake),
    Transitioning,
}

/// Timing knobs, normally taken from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    pub apply_timeout: Duration,
    pub retry_interval: Duration,
    pub clock_check_interval: Duration,
}

impl SchedulerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            apply_timeout: Duration::from_secs(config.apply_timeout_secs()),
            retry_interval: Duration::from_secs(config.retry_interval_secs()),
            clock_check_interval: Duration::from_secs(config.clock_check_interval_secs()),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct ThemeScheduler {
    applier: BoundedApplier,
    clock: SharedTimeSource,
    bus: EventBus,
    config: SchedulerConfig,
    settings: SolarSettings,
    slot: WakeSlot,
    status: Arc<Mutex<SchedulerState>>,
    debug_enabled: bool,
}

impl ThemeScheduler {
    pub fn new(
        applier: BoundedApplier,
        clock: SharedTimeSource,
        bus: EventBus,
        config: SchedulerConfig,
        debug_enabled: bool,
    ) -> Self {
        Self {
            applier,
            clock,
            bus,
            config,
            settings: SolarSettings::default(),
            slot: WakeSlot::new(),
            status: Arc::new(Mutex::new(SchedulerState::Idle)),
            debug_enabled,
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.status.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Shared view of the state, readable from other threads.
    pub fn status_handle(&self) -> Arc<Mutex<SchedulerState>> {
        Arc::clone(&self.status)
    }

    pub fn next_wake(&self) -> Option<&ScheduledWake> {
        self.slot.peek()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// How long the driver may block before it has to look at the clock again.
    pub fn wait_duration(&self) -> Duration {
        let check = self.config.clock_check_interval;
        match self.slot.time_until(self.clock.now()) {
            Some(until) => until.min(check),
            None => check,
        }
    }

    /// React to a new settings record.
    pub fn settings_changed(&mut self, settings: SolarSettings) {
        self.settings = settings;

        if !self.settings.automation_active() {
            if self.slot.cancel().is_some() {
                log_block_start!("Automatic theme switching disabled");
            }
            self.set_status(SchedulerState::Idle);
            return;
        }

        self.transition_pass();
    }

    /// Run a transition pass if the armed wake is due. Returns whether one ran.
    pub fn fire_if_due(&mut self) -> bool {
        let now = self.clock.now();
        let Some(wake) = self.slot.take_due(now) else {
            return false;
        };

        if self.debug_enabled {
            log_debug!(
                "Wake #{} ({}) fired, scheduled for {}, now {}",
                wake.generation,
                wake.reason,
                wake.at.format("%H:%M:%S"),
                now.format("%H:%M:%S")
            );
        }

        self.transition_pass();
        true
    }

    fn transition_pass(&mut self) {
        self.slot.cancel();
        self.set_status(SchedulerState::Transitioning);

        let Some(location) = self.settings.location.clone() else {
            self.set_status(SchedulerState::Idle);
            return;
        };

        let now = self.clock.now();
        let tz = determine_timezone_from_coordinates(location.latitude, location.longitude);
        let date = now.with_timezone(&tz).date_naive();

        let result = match compute_sun_times(
            &location,
            date,
            now,
            self.settings.sunset_offset_minutes,
        ) {
            Ok(result) => result,
            Err(e) => {
                log_pipe!();
                log_warning!("Could not compute sun times for {}: {e}", location.address);
                self.arm_retry(now);
                return;
            }
        };

        if self.debug_enabled {
            log_sun_times(&result);
        }

        let desired = ThemeState::uniform(result.recommended_theme);
        match self.applier.apply(desired) {
            Ok(applied) => {
                log_block_start!(
                    "Applied {} theme via {} applier",
                    applied.apps,
                    self.applier.name()
                );
                self.bus.publish(StateEvent::theme_changed(applied));

                let next = &result.next_transition;
                let earliest = now + ChronoDuration::seconds(MIN_RECHECK_DELAY_SECS);
                let at = next.at.max(earliest);
                self.arm(at, WakeReason::Transition(next.kind));
                log_indented!("Next transition: {} at {}", next.kind, next.local);
            }
            Err(e) => {
                log_pipe!();
                log_warning!("{e}");
                self.bus.publish(StateEvent::apply_failed(e.to_payload()));
                self.arm_retry(now);
            }
        }
    }

    fn arm_retry(&mut self, now: DateTime<Utc>) {
        let delay = ChronoDuration::from_std(self.config.retry_interval)
            .unwrap_or_else(|_| ChronoDuration::seconds(MIN_RECHECK_DELAY_SECS));
        self.arm(now + delay, WakeReason::Retry);
        log_indented!(
            "Retrying in {}s",
            self.config.retry_interval.as_secs()
        );
    }

    fn arm(&mut self, at: DateTime<Utc>, reason: WakeReason) {
        let wake = self.slot.arm(at, reason).clone();
        self.set_status(SchedulerState::Armed(wake));
    }

    fn set_status(&self, state: SchedulerState) {
        match self.status.lock() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ThemeMode;
    use crate::geo::{GeoLocation, TransitionKind};
    use crate::testing::RecordingApplier;
    use crate::time_source::{ManualTimeSource, TimeSource};
    use chrono::TimeZone;

    fn shanghai() -> GeoLocation {
        GeoLocation {
            address: "Shanghai".to_string(),
            display_name: "上海市, 中国".to_string(),
            latitude: 31.2304,
            longitude: 121.4737,
        }
    }

    fn enabled() -> SolarSettings {
        SolarSettings {
            auto_theme_enabled: true,
            sunset_offset_minutes: 0,
            location: Some(shanghai()),
        }
    }

    fn test_config() -> SchedulerConfig {
        SchedulerConfig {
            apply_timeout: Duration::from_millis(200),
            retry_interval: Duration::from_secs(60),
            clock_check_interval: Duration::from_secs(30),
        }
    }

    // Noon in Shanghai (UTC+8) on midsummer day
    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 21, 4, 0, 0).unwrap()
    }

    fn scheduler(
        applier: Arc<RecordingApplier>,
        clock: Arc<ManualTimeSource>,
    ) -> (ThemeScheduler, EventBus) {
        let bus = EventBus::new();
        let bounded = BoundedApplier::new(applier, test_config().apply_timeout);
        let scheduler = ThemeScheduler::new(bounded, clock, bus.clone(), test_config(), false);
        (scheduler, bus)
    }

    #[test]
    fn test_disabled_settings_stay_idle() {
        let applier = Arc::new(RecordingApplier::new());
        let clock = Arc::new(ManualTimeSource::new(noon()));
        let (mut scheduler, _) = scheduler(applier.clone(), clock);

        scheduler.settings_changed(SolarSettings::default());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(applier.applied().is_empty());
    }

    #[test]
    fn test_enabling_applies_immediately_and_arms_sunset() {
        let applier = Arc::new(RecordingApplier::new());
        let clock = Arc::new(ManualTimeSource::new(noon()));
        let (mut scheduler, bus) = scheduler(applier.clone(), clock);
        let sub = bus.subscribe();

        scheduler.settings_changed(enabled());

        assert_eq!(applier.applied(), vec![ThemeState::uniform(ThemeMode::Light)]);
        let SchedulerState::Armed(wake) = scheduler.state() else {
            panic!("expected armed scheduler");
        };
        assert_eq!(wake.reason, WakeReason::Transition(TransitionKind::Sunset));
        assert!(wake.at > noon());
        assert!(matches!(
            sub.receiver.try_recv().unwrap(),
            StateEvent::ThemeStateChanged { .. }
        ));
    }

    #[test]
    fn test_disabling_cancels_wake() {
        let applier = Arc::new(RecordingApplier::new());
        let clock = Arc::new(ManualTimeSource::new(noon()));
        let (mut scheduler, _) = scheduler(applier, clock);

        scheduler.settings_changed(enabled());
        assert!(scheduler.next_wake().is_some());

        scheduler.settings_changed(SolarSettings {
            auto_theme_enabled: false,
            ..enabled()
        });
        assert!(scheduler.next_wake().is_none());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_wake_not_due_does_nothing() {
        let applier = Arc::new(RecordingApplier::new());
        let clock = Arc::new(ManualTimeSource::new(noon()));
        let (mut scheduler, _) = scheduler(applier.clone(), clock.clone());

        scheduler.settings_changed(enabled());
        clock.advance(ChronoDuration::hours(1));
        assert!(!scheduler.fire_if_due());
        assert_eq!(applier.applied().len(), 1);
    }

    #[test]
    fn test_wake_at_sunset_applies_dark_and_arms_sunrise() {
        let applier = Arc::new(RecordingApplier::new());
        let clock = Arc::new(ManualTimeSource::new(noon()));
        let (mut scheduler, _) = scheduler(applier.clone(), clock.clone());

        scheduler.settings_changed(enabled());
        let sunset = scheduler.next_wake().unwrap().at;

        clock.set(sunset);
        assert!(scheduler.fire_if_due());

        assert_eq!(
            applier.applied().last(),
            Some(&ThemeState::uniform(ThemeMode::Dark))
        );
        let wake = scheduler.next_wake().unwrap();
        assert_eq!(wake.reason, WakeReason::Transition(TransitionKind::Sunrise));
        assert!(wake.at > sunset);
    }

    #[test]
    fn test_slept_through_schedule_applies_once_for_actual_time() {
        let applier = Arc::new(RecordingApplier::new());
        let clock = Arc::new(ManualTimeSource::new(noon()));
        let (mut scheduler, _) = scheduler(applier.clone(), clock.clone());

        scheduler.settings_changed(enabled());

        // Suspended past sunset and the following sunrise; wakes mid-morning
        clock.set(noon() + ChronoDuration::hours(22));
        assert!(scheduler.fire_if_due());

        assert_eq!(
            applier.applied(),
            vec![
                ThemeState::uniform(ThemeMode::Light),
                ThemeState::uniform(ThemeMode::Light)
            ]
        );
        let wake = scheduler.next_wake().unwrap();
        assert_eq!(wake.reason, WakeReason::Transition(TransitionKind::Sunset));
        assert!(wake.at > clock.now());
    }

    #[test]
    fn test_failed_apply_emits_and_arms_retry() {
        let applier = Arc::new(RecordingApplier::failing());
        let clock = Arc::new(ManualTimeSource::new(noon()));
        let (mut scheduler, bus) = scheduler(applier.clone(), clock.clone());
        let sub = bus.subscribe();

        scheduler.settings_changed(enabled());

        let wake = scheduler.next_wake().unwrap().clone();
        assert_eq!(wake.reason, WakeReason::Retry);
        assert_eq!(wake.at, noon() + ChronoDuration::seconds(60));
        match sub.receiver.try_recv().unwrap() {
            StateEvent::ThemeApplyFailed { error } => {
                assert_eq!(error.code, "errors.auto_theme.apply_failed");
            }
            other => panic!("unexpected event {other:?}"),
        }

        // Recovers on the retry
        applier.set_failing(false);
        clock.set(wake.at);
        assert!(scheduler.fire_if_due());
        assert_eq!(
            scheduler.next_wake().unwrap().reason,
            WakeReason::Transition(TransitionKind::Sunset)
        );
    }

    #[test]
    fn test_wait_is_capped_by_clock_check_interval() {
        let applier = Arc::new(RecordingApplier::new());
        let clock = Arc::new(ManualTimeSource::new(noon()));
        let (mut scheduler, _) = scheduler(applier, clock.clone());

        assert_eq!(scheduler.wait_duration(), Duration::from_secs(30));
        scheduler.settings_changed(enabled());
        assert_eq!(scheduler.wait_duration(), Duration::from_secs(30));

        let at = scheduler.next_wake().unwrap().at;
        clock.set(at - ChronoDuration::seconds(5));
        assert_eq!(scheduler.wait_duration(), Duration::from_secs(5));
    }
}
