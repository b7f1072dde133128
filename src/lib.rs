//! # Duskswitch Library
//!
//! Internal library for the duskswitch binary application
//!
//! This library exists to enable testing of the solar and scheduling internals
//! and to keep CLI dispatch (main.rs) separate from application logic.
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Entry Point**: `Duskswitch` is the service facade; every CLI command and
//!   the scheduler go through it
//! - **Geographic**: `geo` computes sunrise/sunset, theme recommendations and the
//!   next transition, and resolves addresses through a geocoder
//! - **State**: `state` holds the persisted solar settings, the settings store and
//!   the event bus that fans out change notifications
//! - **Scheduler**: `scheduler` arms one wake at a time and applies the theme at
//!   each transition
//! - **Backends**: `backend` defines the theme applier seam and the command-hook
//!   implementation
//! - **Configuration**: `config` for TOML-based settings
//! - **Infrastructure**: argument parsing, logging, error types and the clock

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

// Public API modules
pub mod args;
pub mod backend;
pub mod commands;
pub mod config;
pub mod constants;
pub mod duskswitch;
pub mod error;
pub mod geo;
pub mod scheduler;
pub mod state;
pub mod time_source;

#[cfg(any(test, feature = "testing-support"))]
pub mod testing;

pub use crate::duskswitch::{Duskswitch, DuskswitchBuilder};
pub use error::{ErrorPayload, SolarError, SolarResult};
