//! Run command: the foreground scheduler daemon.
//!
//! Starts the scheduler and the settings watcher, then waits for SIGINT or
//! SIGTERM. With `--json`, every event published on the bus is written to
//! stdout as one JSON object per line; otherwise activity is logged with
//! wall-clock timestamps.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use super::status::log_settings;
use crate::args::GlobalOptions;
use crate::config::{self, get_custom_config_dir};
use crate::duskswitch::Duskswitch;
use crate::logger::Log;
use crate::scheduler::SchedulerState;
use crate::state::StateEvent;
use crate::state::watcher::{SettingsWatcher, watch_target};

/// How often the main thread checks the shutdown flag.
const SHUTDOWN_POLL_MS: u64 = 200;

pub fn handle_run_command(options: &GlobalOptions, log_file: Option<String>) -> Result<()> {
    let _log_guard = match log_file {
        Some(path) => Some(
            Log::start_file_logging(path.clone())
                .with_context(|| format!("Failed to start logging to {path}"))?,
        ),
        None => None,
    };
    Log::set_timestamps(true);

    log_version!();
    if let Some(dir) = get_custom_config_dir() {
        log_block_start!("Base directory: {}", dir.display());
    }

    let config = config::load()?;
    config.log_config();

    let service = Duskswitch::from_config(&config, options.debug_enabled)?;
    log_settings(&service.get_solar_settings());

    // Set by the signal handlers; inverted from a "running" flag
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("Failed to register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("Failed to register SIGTERM handler")?;

    let events = service.subscribe();
    let scheduler = service.start_scheduler()?;

    let watcher = match watch_target(service.store()) {
        Some(path) => match SettingsWatcher::start(
            Arc::clone(service.store()),
            &path,
            options.debug_enabled,
        ) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                log_pipe!();
                log_warning!("Settings watcher unavailable: {e:#}");
                log_indented!("Changes made from other terminals apply after a restart");
                None
            }
        },
        None => None,
    };

    if !service.get_solar_settings().automation_active() {
        log_pipe!();
        log_info!("Automatic switching is off; waiting for 'duskswitch auto on'");
    }

    while !shutdown.load(Ordering::SeqCst) {
        match events
            .receiver
            .recv_timeout(Duration::from_millis(SHUTDOWN_POLL_MS))
        {
            Ok(event) => report_event(&event, options)?,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    log_block_start!("Shutting down");
    if let Some(watcher) = watcher {
        watcher.stop();
    }
    if options.debug_enabled
        && let SchedulerState::Armed(wake) = scheduler.state()
    {
        log_debug!("Dropping pending wake #{} ({})", wake.generation, wake.reason);
    }
    scheduler.stop();
    service.unsubscribe(events.id);
    log_end!();

    Ok(())
}

fn report_event(event: &StateEvent, options: &GlobalOptions) -> Result<()> {
    if options.json {
        return super::print_json(event);
    }

    match event {
        StateEvent::SolarSettingsChanged { settings } => {
            if options.debug_enabled {
                log_debug!("Settings changed");
                log_settings(settings);
            }
        }
        StateEvent::AutoThemeConfigurationRequired { error }
        | StateEvent::ThemeApplyFailed { error } => {
            if options.debug_enabled {
                log_debug!("{}: {}", event.name(), error.code);
            }
        }
        StateEvent::ThemeStateChanged { .. } => {}
    }
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("run - Run the theme scheduler in the foreground");
    log_block_start!("Usage: duskswitch [run] [OPTIONS]");
    log_block_start!("Options:");
    log_indented!("-l, --log <file>  Write log output to a file instead of stdout");
    log_indented!("-j, --json        Stream events as JSON lines");
    log_indented!("-d, --debug       Log every wake and settings change");
    log_block_start!("Behavior:");
    log_indented!("Applies the recommended theme whenever automation is enabled");
    log_indented!("or the saved location/offset changes, then at every sunrise");
    log_indented!("and effective sunset. Stop with Ctrl+C.");
    log_end!();
}
