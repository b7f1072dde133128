//! Settings file watching for edits made by other processes.
//!
//! A CLI invocation such as `duskswitch offset 30` writes `settings.toml`
//! directly. The running daemon notices the write here and calls
//! [`SettingsStore::reload`], which publishes `SolarSettingsChanged` when the
//! record actually differs, so the scheduler re-arms. The daemon's own writes
//! reload to an identical record and publish nothing.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::state::store::SettingsStore;

/// Quiet period after the last file event before reloading.
/// Editors and atomic writers touch the file in several steps.
const DEBOUNCE_MS: u64 = 500;

/// Handle to the watcher thread; stops it on drop.
pub struct SettingsWatcher {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SettingsWatcher {
    /// Start watching the directory that holds `settings_path`.
    pub fn start(
        store: Arc<SettingsStore>,
        settings_path: &Path,
        debug_enabled: bool,
    ) -> Result<Self> {
        let dir = settings_path
            .parent()
            .context("Settings path has no parent directory")?
            .to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create state directory {}", dir.display()))?;

        let file_name = settings_path
            .file_name()
            .context("Settings path has no file name")?
            .to_os_string();

        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    match event.kind {
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
                            let _ = tx.send(event);
                        }
                        _ => {}
                    }
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        // Watch the directory, not the file: atomic renames replace the inode
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", dir.display()))?;

        if debug_enabled {
            log_pipe!();
            log_debug!("Watching settings for external changes: {}", dir.display());
        }

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name("settings-watcher".to_string())
            .spawn(move || {
                let _watcher = watcher;
                watch_loop(&rx, &store, &file_name, &thread_running, debug_enabled);
            })
            .context("Failed to spawn settings watcher thread")?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the watcher thread and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SettingsWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn watch_loop(
    rx: &mpsc::Receiver<Event>,
    store: &SettingsStore,
    file_name: &std::ffi::OsStr,
    running: &AtomicBool,
    debug_enabled: bool,
) {
    let debounce = Duration::from_millis(DEBOUNCE_MS);
    let mut pending = false;

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(debounce) {
            Ok(event) => {
                if event
                    .paths
                    .iter()
                    .any(|path| touches_settings(path, file_name))
                {
                    pending = true;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if pending {
                    pending = false;
                    reload(store, debug_enabled);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn touches_settings(path: &Path, file_name: &std::ffi::OsStr) -> bool {
    path.file_name() == Some(file_name)
}

fn reload(store: &SettingsStore, debug_enabled: bool) {
    match store.reload() {
        Ok(true) => {
            log_block_start!("Settings changed externally, reloaded");
        }
        Ok(false) => {
            if debug_enabled {
                log_debug!("Settings file touched, no change");
            }
        }
        Err(e) => {
            log_pipe!();
            log_warning!("Failed to reload settings: {e:#}");
        }
    }
}

/// Path of the settings file the watcher should follow, if the store has one.
pub fn watch_target(store: &SettingsStore) -> Option<PathBuf> {
    store.path().map(Path::to_path_buf)
}
