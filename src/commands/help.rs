//! Help command implementation for duskswitch.
//!
//! This module provides a dispatcher for the help command that shows
//! command-specific help or general help based on the arguments provided.

use anyhow::Result;

use crate::args::canonical_command;

/// Run the help command (dispatcher)
///
/// # Arguments
/// * `command` - Optional command name to get help for (None = general help)
pub fn run_help_command(command: Option<&str>) -> Result<()> {
    let Some(command) = command else {
        display_general_help();
        return Ok(());
    };

    match canonical_command(command) {
        Some("run") => super::run::display_help(),
        Some("status") => super::status::display_help(),
        Some("location") => super::set::display_location_help(),
        Some("auto") => super::set::display_auto_help(),
        Some("offset") => super::set::display_offset_help(),
        Some("theme") => super::theme::display_help(),
        Some("sun") => super::sun::display_help(),
        Some("help") => display_help_help(),
        _ => {
            log_warning_standalone!("Unknown command: {command}");
            display_general_help();
        }
    }
    Ok(())
}

/// Display the full usage, including global options (`--help`).
pub fn display_usage() {
    log_version!();
    log_block_start!("Usage: duskswitch [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>  Use a custom configuration directory");
    log_indented!("-d, --debug         Enable detailed debug output");
    log_indented!("-j, --json          Machine-readable output");
    log_indented!("-h, --help          Print help information");
    log_indented!("-V, --version       Print version information");
    log_commands();
    log_end!();
}

fn display_general_help() {
    log_version!();
    log_commands();
    log_pipe!();
    log_info!("Use 'duskswitch help <command>' for detailed help on a command.");
    log_end!();
}

fn log_commands() {
    log_block_start!("Commands:");
    log_indented!("run, r                   Run the theme scheduler (default)");
    log_indented!("status, st               Show settings, theme and today's sun times");
    log_indented!("location, loc <address>  Geocode and save a location");
    log_indented!("auto, a <on|off>         Enable or disable automatic switching");
    log_indented!("offset, o <minutes>      Start the dark theme earlier than sunset");
    log_indented!("theme, t [mode]          Show or switch the theme by hand");
    log_indented!("sun, s [address]         Show sun times");
    log_indented!("help, h [COMMAND]        Show detailed help for a command");
}

fn display_help_help() {
    log_version!();
    log_block_start!("help - Display help information");
    log_block_start!("Usage: duskswitch help [COMMAND]");
    log_block_start!("Arguments:");
    log_indented!("COMMAND  Optional command to get help for");
    log_indented!("         If omitted, shows general help");
    log_end!();
}

