//! Command-line command handlers for duskswitch.
//!
//! Each command lives in its own submodule. One-shot commands open the
//! service against the same state directory the daemon uses, so a change
//! made here is persisted under the settings lock and picked up by a running
//! `duskswitch run` through its settings watcher.

pub mod help;
pub mod run;
pub mod set;
pub mod status;
pub mod sun;
pub mod theme;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::args::GlobalOptions;
use crate::config;
use crate::duskswitch::Duskswitch;
use crate::error::{ErrorPayload, SolarResult};

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a ErrorPayload,
}

/// Load the configuration and wire the service for a one-shot command.
pub(crate) fn open_service(options: &GlobalOptions) -> Result<Duskswitch> {
    let config = config::load()?;
    Duskswitch::from_config(&config, options.debug_enabled)
}

/// Print one value as a single line of JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let line = serde_json::to_string(value).context("Failed to serialize JSON output")?;
    println!("{line}");
    Ok(())
}

/// Report the outcome of a domain operation.
///
/// In JSON mode the value (or `{"error": ...}`) goes to stdout; otherwise
/// `render` logs the value. Errors are still returned so the process exits
/// non-zero.
pub(crate) fn emit<T: Serialize>(
    options: &GlobalOptions,
    result: SolarResult<T>,
    render: impl FnOnce(&T),
) -> Result<()> {
    match result {
        Ok(value) => {
            if options.json {
                print_json(&value)?;
            } else {
                render(&value);
            }
            Ok(())
        }
        Err(e) => {
            if options.json {
                print_json(&ErrorResponse {
                    error: &e.to_payload(),
                })?;
            }
            Err(e.into())
        }
    }
}
