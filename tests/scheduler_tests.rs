//! End-to-end scheduling through the service facade, driven by a manual clock.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use duskswitch::Duskswitch;
use duskswitch::backend::{ThemeMode, ThemeState};
use duskswitch::error::SolarError;
use duskswitch::scheduler::{SchedulerConfig, SchedulerState};
use duskswitch::state::StateEvent;
use duskswitch::testing::{RecordingApplier, StaticGeocoder};
use duskswitch::time_source::{ManualTimeSource, TimeSource};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

// Noon in Shanghai; sunset is around 11:00 UTC
fn shanghai_noon() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-21T04:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

struct Harness {
    service: Duskswitch,
    clock: Arc<ManualTimeSource>,
    applier: Arc<RecordingApplier>,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualTimeSource::new(shanghai_noon()));
    let applier = Arc::new(RecordingApplier::new());
    let geocoder = StaticGeocoder::new().with("Shanghai", 31.2304, 121.4737);

    let service = Duskswitch::builder(Arc::new(geocoder), applier.clone())
        .clock(clock.clone())
        .scheduler_config(SchedulerConfig {
            apply_timeout: Duration::from_secs(2),
            retry_interval: Duration::from_secs(60),
            clock_check_interval: Duration::from_millis(20),
        })
        .build()
        .unwrap();

    Harness {
        service,
        clock,
        applier,
    }
}

/// Wait for the next theme change, skipping unrelated events.
fn next_theme(events: &Receiver<StateEvent>) -> Option<ThemeState> {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    loop {
        let remaining = deadline.checked_duration_since(Instant::now())?;
        match events.recv_timeout(remaining).ok()? {
            StateEvent::ThemeStateChanged { state } => return Some(state),
            _ => continue,
        }
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_scheduler_follows_the_sun() {
    let h = harness();
    h.service.save_solar_location("Shanghai").unwrap();
    h.service.set_auto_theme_enabled(true).unwrap();

    let events = h.service.subscribe();
    let scheduler = h.service.start_scheduler().unwrap();

    assert_eq!(
        next_theme(&events.receiver),
        Some(ThemeState::uniform(ThemeMode::Light))
    );
    assert!(wait_until(|| matches!(
        scheduler.state(),
        SchedulerState::Armed(_)
    )));

    // Past sunset
    h.clock.set(shanghai_noon() + ChronoDuration::hours(8));
    assert_eq!(
        next_theme(&events.receiver),
        Some(ThemeState::uniform(ThemeMode::Dark))
    );

    // Next morning
    h.clock.set(shanghai_noon() + ChronoDuration::hours(24));
    assert_eq!(
        next_theme(&events.receiver),
        Some(ThemeState::uniform(ThemeMode::Light))
    );

    scheduler.stop();
    assert_eq!(
        h.applier.applied(),
        vec![
            ThemeState::uniform(ThemeMode::Light),
            ThemeState::uniform(ThemeMode::Dark),
            ThemeState::uniform(ThemeMode::Light),
        ]
    );
}

#[test]
fn test_enabling_while_running_applies_immediately() {
    let h = harness();
    h.service.save_solar_location("Shanghai").unwrap();

    let events = h.service.subscribe();
    let scheduler = h.service.start_scheduler().unwrap();
    assert!(wait_until(|| scheduler.state() == SchedulerState::Idle));
    assert!(h.applier.applied().is_empty());

    h.service.set_auto_theme_enabled(true).unwrap();
    assert_eq!(
        next_theme(&events.receiver),
        Some(ThemeState::uniform(ThemeMode::Light))
    );

    h.service.set_auto_theme_enabled(false).unwrap();
    assert!(wait_until(|| scheduler.state() == SchedulerState::Idle));

    // Disabled: crossing sunset changes nothing
    h.clock.set(shanghai_noon() + ChronoDuration::hours(8));
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(h.applier.applied().len(), 1);

    scheduler.stop();
}

#[test]
fn test_offset_change_darkens_before_sunset() {
    let h = harness();
    h.service.save_solar_location("Shanghai").unwrap();
    h.service.set_auto_theme_enabled(true).unwrap();
    // About 30 minutes before sunset
    h.clock.set(shanghai_noon() + ChronoDuration::minutes(6 * 60 + 30));

    let events = h.service.subscribe();
    let scheduler = h.service.start_scheduler().unwrap();
    assert_eq!(
        next_theme(&events.receiver),
        Some(ThemeState::uniform(ThemeMode::Light))
    );

    h.service.set_sunset_offset_minutes(90).unwrap();
    assert_eq!(
        next_theme(&events.receiver),
        Some(ThemeState::uniform(ThemeMode::Dark))
    );

    match scheduler.state() {
        SchedulerState::Armed(wake) => assert!(wake.at > h.clock.now()),
        other => panic!("expected an armed wake, got {other:?}"),
    }

    scheduler.stop();
}

#[test]
fn test_manual_theme_holds_until_next_transition() {
    let h = harness();
    h.service.save_solar_location("Shanghai").unwrap();
    h.service.set_auto_theme_enabled(true).unwrap();

    let events = h.service.subscribe();
    let scheduler = h.service.start_scheduler().unwrap();
    assert_eq!(
        next_theme(&events.receiver),
        Some(ThemeState::uniform(ThemeMode::Light))
    );
    assert!(wait_until(|| matches!(
        scheduler.state(),
        SchedulerState::Armed(_)
    )));

    let dark = ThemeState::uniform(ThemeMode::Dark);
    assert_eq!(h.service.set_theme_state(dark), Ok(dark));
    assert_eq!(next_theme(&events.receiver), Some(dark));
    assert_eq!(h.service.get_theme_state(), Ok(dark));

    // Still afternoon: the scheduler leaves the manual choice alone
    h.clock.advance(ChronoDuration::hours(1));
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(h.applier.applied().len(), 2);

    // Next morning's sunrise takes over again
    h.clock.set(shanghai_noon() + ChronoDuration::hours(24));
    let mut latest = next_theme(&events.receiver);
    while latest == Some(dark) {
        latest = next_theme(&events.receiver);
    }
    assert_eq!(latest, Some(ThemeState::uniform(ThemeMode::Light)));

    scheduler.stop();
}

#[test]
fn test_failed_apply_is_reported_and_retried() {
    let h = harness();
    h.applier.set_failing(true);
    h.service.save_solar_location("Shanghai").unwrap();
    h.service.set_auto_theme_enabled(true).unwrap();

    let events = h.service.subscribe();
    let scheduler = h.service.start_scheduler().unwrap();

    let deadline = Instant::now() + EVENT_TIMEOUT;
    let failure = loop {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or_default();
        match events.receiver.recv_timeout(remaining) {
            Ok(StateEvent::ThemeApplyFailed { error }) => break error,
            Ok(_) => continue,
            Err(e) => panic!("no failure event: {e}"),
        }
    };
    assert_eq!(failure.code, "errors.auto_theme.apply_failed");

    h.applier.set_failing(false);
    h.clock.advance(ChronoDuration::seconds(61));
    assert_eq!(
        next_theme(&events.receiver),
        Some(ThemeState::uniform(ThemeMode::Light))
    );

    scheduler.stop();
}

#[test]
fn test_enabling_without_location_is_announced() {
    let h = harness();
    let events = h.service.subscribe();

    let result = h.service.set_auto_theme_enabled(true);
    assert_eq!(result, Err(SolarError::ConfigurationRequired));
    assert!(!h.service.get_solar_settings().auto_theme_enabled);

    match events.receiver.recv_timeout(EVENT_TIMEOUT) {
        Ok(StateEvent::AutoThemeConfigurationRequired { error }) => {
            assert_eq!(error.code, "errors.auto_theme.location_required_for_enable");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_stopping_releases_the_bus() {
    let h = harness();
    let before = h.service.bus().subscriber_count();

    let scheduler = h.service.start_scheduler().unwrap();
    assert_eq!(h.service.bus().subscriber_count(), before + 1);
    assert!(scheduler.is_running());

    scheduler.stop();
    assert_eq!(h.service.bus().subscriber_count(), before);
}
