//! Command-line argument parsing and processing.
//!
//! Global flags may appear anywhere on the command line. The first
//! positional argument selects the command; with none, `run` is implied.
//! Everything after the command is its arguments, so
//! `duskswitch location New York` saves "New York" without quoting.

/// Flags shared by every command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalOptions {
    pub debug_enabled: bool,
    pub config_dir: Option<String>,
    /// Print machine-readable JSON instead of the decorated log output.
    pub json: bool,
}

/// What the `theme` command should switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeTarget {
    Light,
    Dark,
    /// The opposite of the current application theme
    Toggle,
}

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the scheduler in the foreground until interrupted
    Run {
        options: GlobalOptions,
        log_file: Option<String>,
    },
    /// Show the saved settings and today's sun times
    Status { options: GlobalOptions },
    /// Geocode and save a location
    Location {
        options: GlobalOptions,
        address: String,
    },
    /// Enable or disable automatic switching
    Auto {
        options: GlobalOptions,
        enabled: bool,
    },
    /// Set the sunset offset in minutes
    Offset {
        options: GlobalOptions,
        minutes: i64,
    },
    /// Show the current theme, or switch it by hand
    Theme {
        options: GlobalOptions,
        target: Option<ThemeTarget>,
    },
    /// Query sun times for an address or the saved location
    Sun {
        options: GlobalOptions,
        address: Option<String>,
        date: Option<String>,
    },
    /// Show help for one command or all of them
    Help { command: Option<String> },

    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to invalid arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// # Arguments
    /// * `args` - Iterator over command-line arguments (typically from std::env::args())
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let action = parse_action(args.into_iter().skip(1).map(|s| s.as_ref().to_string()));
        ParsedArgs { action }
    }
}

fn parse_action(args: impl Iterator<Item = String>) -> CliAction {
    let args: Vec<String> = args.collect();

    let mut options = GlobalOptions::default();
    let mut display_help = false;
    let mut display_version = false;
    let mut log_file: Option<String> = None;
    let mut date: Option<String> = None;
    let mut positionals: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--help" | "-h" => display_help = true,
            "--version" | "-V" | "-v" => display_version = true,
            "--debug" | "-d" => options.debug_enabled = true,
            "--json" | "-j" => options.json = true,
            "--config" | "-c" | "--log" | "-l" | "--date" => {
                let Some(value) = args.get(i + 1).filter(|v| !v.starts_with('-')) else {
                    log_warning!("Missing value for {arg}");
                    return CliAction::ShowHelpDueToError;
                };
                match arg {
                    "--config" | "-c" => options.config_dir = Some(value.clone()),
                    "--log" | "-l" => log_file = Some(value.clone()),
                    _ => date = Some(value.clone()),
                }
                i += 1;
            }
            // Negative numbers are values, not flags ("offset -5" is rejected later)
            _ if arg.starts_with('-') && arg.parse::<i64>().is_err() => {
                log_warning!("Unknown argument: {arg}");
                return CliAction::ShowHelpDueToError;
            }
            _ => positionals.push(arg.to_string()),
        }
        i += 1;
    }

    if display_version {
        return CliAction::ShowVersion;
    }
    if display_help {
        return CliAction::ShowHelp;
    }

    let (command, rest) = match positionals.split_first() {
        Some((command, rest)) => (command.as_str(), rest),
        None => ("run", &[][..]),
    };
    let canonical = canonical_command(command);

    if log_file.is_some() && canonical != Some("run") {
        log_warning!("--log is only valid with the run command");
        return CliAction::ShowHelpDueToError;
    }
    if date.is_some() && canonical != Some("sun") {
        log_warning!("--date is only valid with the sun command");
        return CliAction::ShowHelpDueToError;
    }

    match canonical {
        Some("run") => {
            if !rest.is_empty() {
                log_warning!("run takes no arguments");
                return CliAction::ShowHelpDueToError;
            }
            CliAction::Run { options, log_file }
        }
        Some("status") => {
            if !rest.is_empty() {
                log_warning!("status takes no arguments");
                return CliAction::ShowHelpDueToError;
            }
            CliAction::Status { options }
        }
        Some("location") => {
            if rest.is_empty() {
                log_warning!("Missing address. Usage: duskswitch location <address>");
                return CliAction::ShowHelpDueToError;
            }
            CliAction::Location {
                options,
                address: rest.join(" "),
            }
        }
        Some("auto") => match rest {
            [value] => match parse_switch(value) {
                Some(enabled) => CliAction::Auto { options, enabled },
                None => {
                    log_warning!("Expected 'on' or 'off', got '{value}'");
                    CliAction::ShowHelpDueToError
                }
            },
            _ => {
                log_warning!("Usage: duskswitch auto <on|off>");
                CliAction::ShowHelpDueToError
            }
        },
        Some("offset") => match rest {
            [value] => match value.parse::<i64>() {
                Ok(minutes) => CliAction::Offset { options, minutes },
                Err(_) => {
                    log_warning!("Invalid offset '{value}', expected whole minutes");
                    CliAction::ShowHelpDueToError
                }
            },
            _ => {
                log_warning!("Usage: duskswitch offset <minutes>");
                CliAction::ShowHelpDueToError
            }
        },
        Some("theme") => match rest {
            [] => CliAction::Theme {
                options,
                target: None,
            },
            [value] => match parse_theme_target(value) {
                Some(target) => CliAction::Theme {
                    options,
                    target: Some(target),
                },
                None => {
                    log_warning!("Expected 'light', 'dark' or 'toggle', got '{value}'");
                    CliAction::ShowHelpDueToError
                }
            },
            _ => {
                log_warning!("Usage: duskswitch theme [light|dark|toggle]");
                CliAction::ShowHelpDueToError
            }
        },
        Some("sun") => CliAction::Sun {
            options,
            address: (!rest.is_empty()).then(|| rest.join(" ")),
            date,
        },
        Some("help") => CliAction::Help {
            command: rest.first().cloned(),
        },
        _ => {
            log_warning!("Unknown command: {command}");
            CliAction::ShowHelpDueToError
        }
    }
}

/// Map a command or its alias to the canonical command name.
pub fn canonical_command(command: &str) -> Option<&'static str> {
    match command {
        "run" | "r" => Some("run"),
        "status" | "st" => Some("status"),
        "location" | "loc" => Some("location"),
        "auto" | "a" => Some("auto"),
        "offset" | "o" => Some("offset"),
        "theme" | "t" => Some("theme"),
        "sun" | "s" => Some("sun"),
        "help" | "h" => Some("help"),
        _ => None,
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "enable" | "enabled" | "1" => Some(true),
        "off" | "false" | "disable" | "disabled" | "0" => Some(false),
        _ => None,
    }
}

fn parse_theme_target(value: &str) -> Option<ThemeTarget> {
    match value.to_ascii_lowercase().as_str() {
        "light" => Some(ThemeTarget::Light),
        "dark" => Some(ThemeTarget::Dark),
        "toggle" => Some(ThemeTarget::Toggle),
        _ => None,
    }
}
