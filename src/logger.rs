//! Structured logging with box-drawing output.
//!
//! Every line goes through [`write_output`], which either prints to stdout or
//! forwards the (ANSI-stripped) text to a file sink started with
//! [`Log::start_file_logging`]. The daemon turns on wall-clock timestamps so
//! scheduler activity can be correlated with theme changes after the fact.
//!
//! ## Conventions
//!
//! - `log_block_start!` opens a new conceptual block (`┃` spacer, then `┣ message`).
//! - `log_decorated!` continues a block (`┣ message`).
//! - `log_indented!` prints nested detail (`┃   message`).
//! - `log_pipe!` inserts a spacer before a semantic message such as `log_warning!`.
//! - `log_version!` / `log_end!` frame the output of a whole command.
//! - `log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!` carry a
//!   `[LEVEL]` tag for messages that do not fit the block structure.

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static TIMESTAMPS_ENABLED: AtomicBool = AtomicBool::new(false);

// Set once when `run --log <file>` is used
static LOG_CHANNEL: OnceLock<Sender<LogMessage>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Global switches for the logging macros.
pub struct Log;

impl Log {
    /// Enable or disable all logging output.
    ///
    /// Tests and machine-readable output modes (`--json`) turn logging off so
    /// that stdout only carries the payload.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Prefix each line with the local wall-clock time.
    pub fn set_timestamps(enabled: bool) {
        TIMESTAMPS_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Route all further output into `file_path`.
    ///
    /// The returned guard flushes and closes the file when dropped.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(tx.clone())
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                let mut file = std::fs::File::create(&file_path)?;

                loop {
                    match rx.recv() {
                        Ok(LogMessage::Formatted(text)) => file.write_all(text.as_bytes())?,
                        Ok(LogMessage::Shutdown) | Err(_) => {
                            file.flush()?;
                            break;
                        }
                    }
                }

                Ok::<(), anyhow::Error>(())
            })?;

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Timestamp prefix used by the macros, empty unless timestamps are on.
    pub fn get_timestamp_prefix() -> String {
        if TIMESTAMPS_ENABLED.load(Ordering::SeqCst) {
            format!("[{}] ", chrono::Local::now().format("%H:%M:%S"))
        } else {
            String::new()
        }
    }
}

/// Keeps the file sink alive; flushes it on drop.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Write one formatted chunk to the active sink. Public for macro access.
pub fn write_output(text: &str) {
    if let Some(tx) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

/// Shared body of the line macros: `$layout` receives the timestamp prefix
/// and the rendered message.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    ($layout:expr, $message:expr) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let message: String = $message;
            let layout: fn(&str, &str) -> String = $layout;
            $crate::logger::write_output(&layout(&prefix, &message));
        }
    }};
}

/// Log a message as part of the current block.
#[macro_export]
macro_rules! log_decorated {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!(|p, m| format!("{p}┣ {m}\n"), format!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::__log_line!(|p, m| format!("{p}┣ {m}\n"), format!("{}", $expr))
    };
}

/// Log nested detail belonging to the previous message.
#[macro_export]
macro_rules! log_indented {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!(|p, m| format!("{p}┃   {m}\n"), format!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::__log_line!(|p, m| format!("{p}┃   {m}\n"), format!("{}", $expr))
    };
}

/// Log an empty spacer line.
#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::__log_line!(|p, _m| format!("{p}┃\n"), String::new())
    };
}

/// Start a new block of related messages.
#[macro_export]
macro_rules! log_block_start {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!(|p, m| format!("{p}┃\n{p}┣ {m}\n"), format!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::__log_line!(|p, m| format!("{p}┃\n{p}┣ {m}\n"), format!("{}", $expr))
    };
}

/// Log the application header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::__log_line!(
            |p, m| format!("{p}┏ duskswitch v{m} ━━╸\n"),
            env!("CARGO_PKG_VERSION").to_string()
        )
    };
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {
        $crate::__log_line!(|p, _m| format!("{p}╹\n"), String::new())
    };
}

/// Log a warning in yellow.
#[macro_export]
macro_rules! log_warning {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!(
            |p, m| format!("{p}┣[\x1b[33mWARNING\x1b[0m] {m}\n"),
            format!($fmt $($arg)*)
        )
    };
    ($expr:expr) => {
        $crate::__log_line!(
            |p, m| format!("{p}┣[\x1b[33mWARNING\x1b[0m] {m}\n"),
            format!("{}", $expr)
        )
    };
}

/// Log a warning outside of the block structure.
#[macro_export]
macro_rules! log_warning_standalone {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!(
            |p, m| format!("{p}[\x1b[33mWARNING\x1b[0m] {m}\n"),
            format!($fmt $($arg)*)
        )
    };
}

/// Log an error in red.
#[macro_export]
macro_rules! log_error {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!(
            |p, m| format!("{p}┣[\x1b[31mERROR\x1b[0m] {m}\n"),
            format!($fmt $($arg)*)
        )
    };
    ($expr:expr) => {
        $crate::__log_line!(
            |p, m| format!("{p}┣[\x1b[31mERROR\x1b[0m] {m}\n"),
            format!("{}", $expr)
        )
    };
}

/// Log an error that terminates the command, closing the block.
#[macro_export]
macro_rules! log_error_exit {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!(
            |p, m| format!("{p}┃\n{p}┗[\x1b[31mERROR\x1b[0m] {m}\n"),
            format!($fmt $($arg)*)
        )
    };
    ($expr:expr) => {
        $crate::__log_line!(
            |p, m| format!("{p}┃\n{p}┗[\x1b[31mERROR\x1b[0m] {m}\n"),
            format!("{}", $expr)
        )
    };
}

/// Log an informational message in green.
#[macro_export]
macro_rules! log_info {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!(
            |p, m| format!("{p}┣[\x1b[32mINFO\x1b[0m] {m}\n"),
            format!($fmt $($arg)*)
        )
    };
    ($expr:expr) => {
        $crate::__log_line!(
            |p, m| format!("{p}┣[\x1b[32mINFO\x1b[0m] {m}\n"),
            format!("{}", $expr)
        )
    };
}

/// Log a debug message, only emitted by callers that check `debug_enabled`.
#[macro_export]
macro_rules! log_debug {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!(
            |p, m| format!("{p}┣[\x1b[32mDEBUG\x1b[0m] {m}\n"),
            format!($fmt $($arg)*)
        )
    };
    ($expr:expr) => {
        $crate::__log_line!(
            |p, m| format!("{p}┣[\x1b[32mDEBUG\x1b[0m] {m}\n"),
            format!("{}", $expr)
        )
    };
}

/// Log a critical message in red.
#[macro_export]
macro_rules! log_critical {
    ($fmt:literal $($arg:tt)*) => {
        $crate::__log_line!(
            |p, m| format!("{p}┣[\x1b[31mCRITICAL\x1b[0m] {m}\n"),
            format!($fmt $($arg)*)
        )
    };
}
