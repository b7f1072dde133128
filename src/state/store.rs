//! Single-writer owner of the persisted [`SolarSettings`] record.
//!
//! Every mutation runs the same sequence under one in-process mutex:
//!
//! 1. take the backend's cross-process lock (`fs2` on `settings.lock`)
//! 2. re-read the persisted record so edits made by another process are not lost
//! 3. apply the change and validate it
//! 4. write the record atomically (temp file + rename)
//! 5. publish [`StateEvent::SolarSettingsChanged`] while still holding the mutex,
//!    so subscribers see changes in the order they were made
//!
//! Geocoding for `save_location` happens before any of this, off the lock.
//! Requests are numbered; when a lookup returns, only the most recently
//! issued request may write its answer.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::{
    MAXIMUM_SUNSET_OFFSET_MINUTES, SETTINGS_FILE_NAME, SETTINGS_LOCK_FILE_NAME,
};
use crate::error::{SolarError, SolarResult};
use crate::geo::geocoder::{Geocoder, normalize_address};
use crate::state::bus::EventBus;
use crate::state::events::StateEvent;
use crate::state::settings::SolarSettings;

/// Held for the duration of one read-modify-write. Unlocks on drop.
pub struct SettingsLock {
    file: Option<File>,
}

impl SettingsLock {
    /// A lock that guards nothing, for backends without cross-process access.
    pub fn none() -> Self {
        Self { file: None }
    }
}

impl Drop for SettingsLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = FileExt::unlock(file);
        }
    }
}

/// Where the settings record lives.
pub trait SettingsBackend: Send + Sync {
    /// Read the stored record, `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<SolarSettings>>;

    /// Replace the stored record.
    fn save(&self, settings: &SolarSettings) -> Result<()>;

    /// Exclude other writers until the returned guard is dropped.
    fn lock(&self) -> Result<SettingsLock>;

    /// Path of the backing file, if there is one.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// TOML file in the state directory.
pub struct FileSettingsBackend {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileSettingsBackend {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(SETTINGS_FILE_NAME),
            lock_path: state_dir.join(SETTINGS_LOCK_FILE_NAME),
        }
    }

    fn dir(&self) -> Result<&Path> {
        self.path
            .parent()
            .context("Settings path has no parent directory")
    }
}

impl SettingsBackend for FileSettingsBackend {
    fn load(&self) -> Result<Option<SolarSettings>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let settings: SolarSettings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(settings))
    }

    fn save(&self, settings: &SolarSettings) -> Result<()> {
        let dir = self.dir()?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory {}", dir.display()))?;

        let content = toml::to_string(settings).context("Failed to serialize settings")?;

        // Write to a sibling temp file and rename, so readers never see a partial record
        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        temp.write_all(content.as_bytes())
            .context("Failed to write settings temp file")?;
        temp.as_file()
            .sync_all()
            .context("Failed to flush settings temp file")?;
        temp.persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }

    fn lock(&self) -> Result<SettingsLock> {
        let dir = self.dir()?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory {}", dir.display()))?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .with_context(|| format!("Failed to open {}", self.lock_path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {}", self.lock_path.display()))?;

        Ok(SettingsLock { file: Some(file) })
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// In-memory backend; counts saves so tests can observe persistence.
#[derive(Default)]
pub struct MemorySettingsBackend {
    stored: Mutex<Option<SolarSettings>>,
    saves: AtomicU64,
}

impl MemorySettingsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing record, as if it had been persisted earlier.
    pub fn with_settings(settings: SolarSettings) -> Self {
        Self {
            stored: Mutex::new(Some(settings)),
            saves: AtomicU64::new(0),
        }
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Replace the stored record behind the store's back (an "external edit").
    pub fn overwrite(&self, settings: SolarSettings) {
        if let Ok(mut stored) = self.stored.lock() {
            *stored = Some(settings);
        }
    }
}

impl SettingsBackend for MemorySettingsBackend {
    fn load(&self) -> Result<Option<SolarSettings>> {
        let stored = self
            .stored
            .lock()
            .map_err(|_| anyhow::anyhow!("memory backend poisoned"))?;
        Ok(stored.clone())
    }

    fn save(&self, settings: &SolarSettings) -> Result<()> {
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| anyhow::anyhow!("memory backend poisoned"))?;
        *stored = Some(settings.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn lock(&self) -> Result<SettingsLock> {
        Ok(SettingsLock::none())
    }
}

// Shared with `Arc` so tests can keep a handle on the backend they pass in
impl<T: SettingsBackend + ?Sized> SettingsBackend for Arc<T> {
    fn load(&self) -> Result<Option<SolarSettings>> {
        (**self).load()
    }

    fn save(&self, settings: &SolarSettings) -> Result<()> {
        (**self).save(settings)
    }

    fn lock(&self) -> Result<SettingsLock> {
        (**self).lock()
    }

    fn path(&self) -> Option<&Path> {
        (**self).path()
    }
}

/// Owner of the settings record.
pub struct SettingsStore {
    backend: Box<dyn SettingsBackend>,
    geocoder: Arc<dyn Geocoder>,
    bus: EventBus,
    current: Mutex<SolarSettings>,
    location_request_seq: AtomicU64,
}

impl SettingsStore {
    /// Load the persisted record (or defaults) and take ownership of it.
    pub fn open(
        backend: Box<dyn SettingsBackend>,
        geocoder: Arc<dyn Geocoder>,
        bus: EventBus,
    ) -> Result<Self> {
        let initial = load_sanitized(backend.as_ref())?.unwrap_or_default();

        Ok(Self {
            backend,
            geocoder,
            bus,
            current: Mutex::new(initial),
            location_request_seq: AtomicU64::new(0),
        })
    }

    /// Current settings.
    pub fn get(&self) -> SolarSettings {
        self.lock_current().clone()
    }

    /// Bus this store publishes on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.backend.path()
    }

    /// Resolve `address` and make it the saved location.
    ///
    /// The address is stored trimmed. If another `save_location` was issued
    /// while this one was geocoding, this one fails with
    /// `LocationRequestSuperseded` and leaves the record untouched.
    pub fn save_location(&self, address: &str) -> SolarResult<SolarSettings> {
        let trimmed = normalize_address(address)?;
        let request = self.location_request_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let mut location = self.geocoder.lookup(trimmed)?;
        location.address = trimmed.to_string();

        self.mutate(|settings| {
            if self.location_request_seq.load(Ordering::SeqCst) != request {
                return Err(SolarError::LocationRequestSuperseded {
                    address: trimmed.to_string(),
                });
            }
            settings.location = Some(location);
            Ok(())
        })
    }

    /// Turn automatic theme switching on or off.
    ///
    /// Enabling without a saved location fails with `ConfigurationRequired`
    /// and leaves the flag off.
    pub fn set_auto_theme_enabled(&self, enabled: bool) -> SolarResult<SolarSettings> {
        self.mutate(|settings| {
            if enabled && settings.location.is_none() {
                settings.auto_theme_enabled = false;
                return Err(SolarError::ConfigurationRequired);
            }
            settings.auto_theme_enabled = enabled;
            Ok(())
        })
    }

    /// Set how many minutes before sunset the dark theme starts.
    ///
    /// Persists and publishes on every successful call, even when the value
    /// is unchanged.
    pub fn set_sunset_offset_minutes(&self, minutes: i64) -> SolarResult<SolarSettings> {
        let max = MAXIMUM_SUNSET_OFFSET_MINUTES;
        let value = u32::try_from(minutes)
            .ok()
            .filter(|value| *value <= max)
            .ok_or(SolarError::InvalidOffset { minutes, max })?;

        self.mutate(|settings| {
            settings.sunset_offset_minutes = value;
            Ok(())
        })
    }

    /// Re-read the persisted record and adopt it if it differs from memory.
    ///
    /// Returns whether anything changed. Used by the settings watcher when
    /// another process edits the file.
    pub fn reload(&self) -> Result<bool> {
        let mut current = self.lock_current();
        let _file_lock = self.backend.lock()?;

        let Some(persisted) = load_sanitized(self.backend.as_ref())? else {
            return Ok(false);
        };
        if persisted == *current {
            return Ok(false);
        }

        *current = persisted.clone();
        self.bus.publish(StateEvent::settings_changed(persisted));
        Ok(true)
    }

    fn mutate<F>(&self, change: F) -> SolarResult<SolarSettings>
    where
        F: FnOnce(&mut SolarSettings) -> SolarResult<()>,
    {
        let mut current = self.lock_current();
        let _file_lock = self.backend.lock().map_err(storage_error)?;

        // Another process may have written since we last looked
        let mut next = match load_sanitized(self.backend.as_ref()) {
            Ok(Some(persisted)) => persisted,
            Ok(None) => current.clone(),
            Err(e) => {
                log_warning!("Could not re-read settings, using in-memory copy: {e:#}");
                current.clone()
            }
        };

        change(&mut next)?;

        self.backend.save(&next).map_err(storage_error)?;
        *current = next.clone();
        self.bus.publish(StateEvent::settings_changed(next.clone()));

        Ok(next)
    }

    fn lock_current(&self) -> MutexGuard<'_, SolarSettings> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn load_sanitized(backend: &dyn SettingsBackend) -> Result<Option<SolarSettings>> {
    let Some(loaded) = backend.load()? else {
        return Ok(None);
    };

    let (settings, repairs) = loaded.sanitize();
    for repair in repairs {
        log_warning!("{repair}");
    }
    Ok(Some(settings))
}

fn storage_error(error: anyhow::Error) -> SolarError {
    SolarError::Storage(format!("{error:#}"))
}
