//! Service facade wiring the settings store, geocoder, theme applier, clock
//! and scheduler together.
//!
//! Production wiring comes from [`Duskswitch::from_config`]; tests and
//! embedders assemble their own collaborators with [`Duskswitch::builder`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use duskswitch::Duskswitch;
//! use duskswitch::backend::CommandApplier;
//! use duskswitch::geo::NominatimGeocoder;
//!
//! # fn main() -> anyhow::Result<()> {
//! let geocoder = NominatimGeocoder::new(
//!     "https://nominatim.openstreetmap.org/search",
//!     std::time::Duration::from_secs(10),
//! )?;
//! let applier = CommandApplier::new("/tmp/theme_state.json".into(), None, None, false)?;
//!
//! let service = Duskswitch::builder(Arc::new(geocoder), Arc::new(applier)).build()?;
//! service.save_solar_location("Reykjavik")?;
//! let _scheduler = service.start_scheduler()?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{BoundedApplier, ThemeApplier, ThemeState, create_applier};
use crate::config::Config;
use crate::error::{SolarError, SolarResult};
use crate::geo::geocoder::normalize_address;
use crate::geo::{
    CachingGeocoder, GeoLocation, Geocoder, NominatimGeocoder, SunTimesResult, compute_sun_times,
    determine_timezone_from_coordinates, resolve_target_date,
};
use crate::scheduler::{self, SchedulerConfig, SchedulerHandle, ThemeScheduler};
use crate::state::{
    self, EventBus, FileSettingsBackend, MemorySettingsBackend, SettingsBackend, SettingsStore,
    SolarSettings, StateEvent, Subscription,
};
use crate::time_source::{SharedTimeSource, system_clock};

/// Entry point to every solar settings and sun time operation.
pub struct Duskswitch {
    store: Arc<SettingsStore>,
    geocoder: Arc<dyn Geocoder>,
    applier: BoundedApplier,
    clock: SharedTimeSource,
    bus: EventBus,
    scheduler_config: SchedulerConfig,
    debug_enabled: bool,
}

/// Builder for [`Duskswitch`] with in-memory persistence and the system
/// clock unless told otherwise.
pub struct DuskswitchBuilder {
    geocoder: Arc<dyn Geocoder>,
    applier: Arc<dyn ThemeApplier>,
    backend: Option<Box<dyn SettingsBackend>>,
    clock: Option<SharedTimeSource>,
    bus: Option<EventBus>,
    scheduler_config: SchedulerConfig,
    debug_enabled: bool,
}

impl DuskswitchBuilder {
    /// Persist settings through `backend`.
    pub fn settings_backend(mut self, backend: Box<dyn SettingsBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Read "now" from `clock` instead of the system clock.
    pub fn clock(mut self, clock: SharedTimeSource) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Publish on an existing bus.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler_config = config;
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug_enabled = enabled;
        self
    }

    /// Load the persisted settings and assemble the service.
    pub fn build(self) -> Result<Duskswitch> {
        let bus = self.bus.unwrap_or_default();
        let backend = self
            .backend
            .unwrap_or_else(|| Box::new(MemorySettingsBackend::new()));
        let store = SettingsStore::open(backend, Arc::clone(&self.geocoder), bus.clone())?;

        let clock = self.clock.unwrap_or_else(system_clock);
        if self.debug_enabled && clock.is_simulated() {
            log_debug!("Using a simulated clock, now {}", clock.now().to_rfc3339());
        }

        Ok(Duskswitch {
            store: Arc::new(store),
            geocoder: self.geocoder,
            applier: BoundedApplier::new(self.applier, self.scheduler_config.apply_timeout),
            clock,
            bus,
            scheduler_config: self.scheduler_config,
            debug_enabled: self.debug_enabled,
        })
    }
}

impl Duskswitch {
    pub fn builder(geocoder: Arc<dyn Geocoder>, applier: Arc<dyn ThemeApplier>) -> DuskswitchBuilder {
        DuskswitchBuilder {
            geocoder,
            applier,
            backend: None,
            clock: None,
            bus: None,
            scheduler_config: SchedulerConfig::default(),
            debug_enabled: false,
        }
    }

    /// Wire the production collaborators described by `config`.
    ///
    /// Settings persist under the state directory of the active config
    /// directory; lookups go to the configured Nominatim endpoint through a
    /// session cache.
    pub fn from_config(config: &Config, debug_enabled: bool) -> Result<Self> {
        let state_dir = state::ensure_state_dir()?;
        if debug_enabled {
            log_debug!("State directory: {}", state_dir.display());
        }

        let nominatim = NominatimGeocoder::new(
            config.geocoder_url(),
            Duration::from_secs(config.geocode_timeout_secs()),
        )?;
        let geocoder: Arc<dyn Geocoder> = Arc::new(CachingGeocoder::new(Arc::new(nominatim)));
        let applier = create_applier(config, &state_dir, debug_enabled)?;

        Self::builder(geocoder, applier)
            .settings_backend(Box::new(FileSettingsBackend::new(&state_dir)))
            .scheduler_config(SchedulerConfig::from_config(config))
            .debug(debug_enabled)
            .build()
    }

    /// The settings store, shared with the settings watcher.
    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    /// Theme currently in effect, as reported by the applier.
    pub fn get_theme_state(&self) -> SolarResult<ThemeState> {
        self.applier.get_state()
    }

    /// Apply `state` by hand and announce it with `ThemeStateChanged`.
    ///
    /// Shares the scheduler's bounded apply, so it fails with
    /// `ThemeApplyFailed` while a scheduled apply is still running. With
    /// automation on, the next transition overrides the manual choice.
    pub fn set_theme_state(&self, state: ThemeState) -> SolarResult<ThemeState> {
        let applied = self.applier.apply(state)?;
        self.bus.publish(StateEvent::theme_changed(applied));
        Ok(applied)
    }

    pub fn get_solar_settings(&self) -> SolarSettings {
        self.store.get()
    }

    /// Geocode `address` and save it as the location.
    pub fn save_solar_location(&self, address: &str) -> SolarResult<SolarSettings> {
        self.store.save_location(address)
    }

    /// Turn automation on or off.
    ///
    /// A refused enable also publishes `AutoThemeConfigurationRequired`, so
    /// listeners can prompt for a location.
    pub fn set_auto_theme_enabled(&self, enabled: bool) -> SolarResult<SolarSettings> {
        self.store.set_auto_theme_enabled(enabled).inspect_err(|e| {
            if *e == SolarError::ConfigurationRequired {
                self.bus
                    .publish(StateEvent::configuration_required(e.to_payload()));
            }
        })
    }

    pub fn set_sunset_offset_minutes(&self, minutes: i64) -> SolarResult<SolarSettings> {
        self.store.set_sunset_offset_minutes(minutes)
    }

    /// Sun times for an arbitrary address, using the saved sunset offset.
    ///
    /// Nothing is persisted and the scheduler is not affected.
    pub fn get_sun_times_by_address(
        &self,
        address: &str,
        date: Option<&str>,
    ) -> SolarResult<SunTimesResult> {
        let trimmed = normalize_address(address)?;
        let mut location = self.geocoder.lookup(trimmed)?;
        location.address = trimmed.to_string();
        self.sun_times_for(&location, date)
    }

    /// Sun times for the saved location.
    pub fn get_sun_times_by_saved_location(
        &self,
        date: Option<&str>,
    ) -> SolarResult<SunTimesResult> {
        let location = self
            .store
            .get()
            .location
            .ok_or(SolarError::NoSavedLocation)?;
        self.sun_times_for(&location, date)
    }

    fn sun_times_for(
        &self,
        location: &GeoLocation,
        date: Option<&str>,
    ) -> SolarResult<SunTimesResult> {
        let now = self.clock.now();
        let tz = determine_timezone_from_coordinates(location.latitude, location.longitude);
        let date = resolve_target_date(date, tz, now)?;
        let offset = self.store.get().sunset_offset_minutes;
        compute_sun_times(location, date, now, offset)
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Start the scheduler driver thread for the current settings.
    pub fn start_scheduler(&self) -> Result<SchedulerHandle> {
        let machine = ThemeScheduler::new(
            self.applier.clone(),
            Arc::clone(&self.clock),
            self.bus.clone(),
            self.scheduler_config,
            self.debug_enabled,
        );

        // Subscribe first so no change can slip between the read and the listen
        let subscription = self.bus.subscribe();
        let initial = self.store.get();
        scheduler::spawn(machine, self.bus.clone(), subscription, initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ThemeMode;
    use crate::testing::{RecordingApplier, StaticGeocoder};
    use crate::time_source::{ManualTimeSource, TimeSource};
    use chrono::{TimeZone, Utc};

    fn service_with(applier: Arc<RecordingApplier>) -> (Duskswitch, Arc<StaticGeocoder>) {
        let geocoder = Arc::new(StaticGeocoder::new().with("Shanghai", 31.2304, 121.4737));
        let clock = Arc::new(ManualTimeSource::new(
            Utc.with_ymd_and_hms(2024, 6, 21, 4, 0, 0).unwrap(),
        ));
        let service = Duskswitch::builder(geocoder.clone(), applier)
            .clock(clock)
            .scheduler_config(SchedulerConfig {
                apply_timeout: Duration::from_millis(200),
                ..SchedulerConfig::default()
            })
            .build()
            .unwrap();
        (service, geocoder)
    }

    fn service() -> (Duskswitch, Arc<StaticGeocoder>) {
        service_with(Arc::new(RecordingApplier::new()))
    }

    #[test]
    fn test_manual_theme_is_applied_and_announced() {
        let applier = Arc::new(RecordingApplier::new());
        let (service, _) = service_with(applier.clone());
        let sub = service.subscribe();

        let wanted = ThemeState {
            apps: ThemeMode::Dark,
            system: ThemeMode::Light,
        };
        assert_eq!(service.set_theme_state(wanted), Ok(wanted));
        assert_eq!(service.get_theme_state(), Ok(wanted));
        assert_eq!(applier.applied(), vec![wanted]);

        match sub.receiver.try_recv().unwrap() {
            StateEvent::ThemeStateChanged { state } => assert_eq!(state, wanted),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_failed_manual_theme_publishes_nothing() {
        let applier = Arc::new(RecordingApplier::failing());
        let (service, _) = service_with(applier.clone());
        let sub = service.subscribe();

        let err = service
            .set_theme_state(ThemeState::uniform(ThemeMode::Dark))
            .unwrap_err();
        assert_eq!(err.code(), "errors.auto_theme.apply_failed");
        assert!(applier.applied().is_empty());
        assert!(sub.receiver.try_recv().is_err());
    }

    #[test]
    fn test_manual_theme_refused_while_apply_in_flight() {
        let applier = Arc::new(RecordingApplier::with_delay(Duration::from_millis(800)));
        let (service, _) = service_with(applier);

        // Times out after 200ms, worker keeps running
        assert!(service.set_theme_state(ThemeState::uniform(ThemeMode::Dark)).is_err());
        let refused = service.set_theme_state(ThemeState::uniform(ThemeMode::Light));
        assert!(
            matches!(refused, Err(SolarError::ThemeApplyFailed(msg)) if msg.contains("still running"))
        );
    }

    #[test]
    fn test_debug_service_reads_simulated_clock() {
        let clock = Arc::new(ManualTimeSource::new(
            Utc.with_ymd_and_hms(2030, 1, 2, 4, 0, 0).unwrap(),
        ));
        assert!(clock.is_simulated());
        let geocoder = Arc::new(StaticGeocoder::new().with("Shanghai", 31.2304, 121.4737));
        let service = Duskswitch::builder(geocoder, Arc::new(RecordingApplier::new()))
            .clock(clock)
            .debug(true)
            .build()
            .unwrap();

        let result = service.get_sun_times_by_address("Shanghai", None).unwrap();
        assert_eq!(result.date, "2030-01-02");
    }

    #[test]
    fn test_refused_enable_publishes_configuration_required() {
        let (service, _) = service();
        let sub = service.subscribe();

        assert_eq!(
            service.set_auto_theme_enabled(true),
            Err(SolarError::ConfigurationRequired)
        );
        match sub.receiver.try_recv().unwrap() {
            StateEvent::AutoThemeConfigurationRequired { error } => {
                assert_eq!(error.code, "errors.auto_theme.location_required_for_enable");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_saved_location_query_requires_location() {
        let (service, _) = service();
        assert_eq!(
            service.get_sun_times_by_saved_location(None),
            Err(SolarError::NoSavedLocation)
        );
    }

    #[test]
    fn test_address_query_does_not_persist() {
        let (service, geocoder) = service();
        let result = service.get_sun_times_by_address("  Shanghai ", None).unwrap();

        assert_eq!(result.address, "Shanghai");
        assert_eq!(result.date, "2024-06-21");
        assert_eq!(result.timezone, "Asia/Shanghai");
        assert_eq!(geocoder.lookup_count(), 1);
        assert!(service.get_solar_settings().location.is_none());
    }

    #[test]
    fn test_saved_location_query_uses_saved_offset() {
        let (service, _) = service();
        service.save_solar_location("Shanghai").unwrap();

        let plain = service.get_sun_times_by_saved_location(Some("2024-06-21")).unwrap();
        service.set_sunset_offset_minutes(60).unwrap();
        let shifted = service.get_sun_times_by_saved_location(Some("2024-06-21")).unwrap();

        assert_eq!(plain.sunset_utc, shifted.sunset_utc);
        assert_ne!(plain.effective_sunset_utc, shifted.effective_sunset_utc);
    }

    #[test]
    fn test_blank_address_query_rejected() {
        let (service, geocoder) = service();
        assert_eq!(
            service.get_sun_times_by_address("   ", None),
            Err(SolarError::InvalidAddress)
        );
        assert_eq!(geocoder.lookup_count(), 0);
    }

    #[test]
    fn test_invalid_date_rejected() {
        let (service, _) = service();
        assert!(matches!(
            service.get_sun_times_by_address("Shanghai", Some("21/06/2024")),
            Err(SolarError::InvalidDate { .. })
        ));
    }
}
