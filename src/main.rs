//! Main application entry point and high-level flow coordination.
//!
//! Parses the command line, sets the process-wide configuration directory
//! and logging mode, then hands off to the matching handler in
//! [`duskswitch::commands`]. Any error that reaches this level ends the
//! process with `EXIT_FAILURE`.

use anyhow::Result;

use duskswitch::args::{CliAction, GlobalOptions, ParsedArgs};
use duskswitch::commands;
use duskswitch::config;
use duskswitch::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use duskswitch::logger::Log;
use duskswitch::{log_end, log_error_exit, log_version};

fn main() {
    let parsed = ParsedArgs::parse(std::env::args());

    let code = match dispatch(parsed.action) {
        Ok(code) => code,
        Err(e) => {
            log_error_exit!("{e:#}");
            EXIT_FAILURE
        }
    };

    std::process::exit(code);
}

fn dispatch(action: CliAction) -> Result<i32> {
    match action {
        CliAction::ShowVersion => {
            log_version!();
            log_end!();
        }
        CliAction::ShowHelp => commands::help::display_usage(),
        CliAction::ShowHelpDueToError => {
            commands::help::display_usage();
            return Ok(EXIT_FAILURE);
        }
        CliAction::Help { command } => commands::help::run_help_command(command.as_deref())?,
        CliAction::Run { options, log_file } => {
            prepare(&options)?;
            commands::run::handle_run_command(&options, log_file)?;
        }
        CliAction::Status { options } => {
            prepare(&options)?;
            commands::status::handle_status_command(&options)?;
        }
        CliAction::Location { options, address } => {
            prepare(&options)?;
            commands::set::handle_location_command(&options, &address)?;
        }
        CliAction::Auto { options, enabled } => {
            prepare(&options)?;
            commands::set::handle_auto_command(&options, enabled)?;
        }
        CliAction::Offset { options, minutes } => {
            prepare(&options)?;
            commands::set::handle_offset_command(&options, minutes)?;
        }
        CliAction::Theme { options, target } => {
            prepare(&options)?;
            commands::theme::handle_theme_command(&options, target)?;
        }
        CliAction::Sun {
            options,
            address,
            date,
        } => {
            prepare(&options)?;
            commands::sun::handle_sun_command(&options, address.as_deref(), date.as_deref())?;
        }
    }

    Ok(EXIT_SUCCESS)
}

/// Apply the global options that affect every command.
fn prepare(options: &GlobalOptions) -> Result<()> {
    config::set_config_dir(options.config_dir.clone())?;

    // JSON output owns stdout
    if options.json {
        Log::set_enabled(false);
    }

    Ok(())
}
