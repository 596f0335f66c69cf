//! # Wallwatch - charging station watcher
//!
//! Polls EV charging stations over Modbus TCP, turns status changes into
//! Signal messages and keeps a per-station log of charging sessions.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration, environment overrides and validation
//! - `logging`: Structured logging and tracing
//! - `error`: Error type shared by every module
//! - `modbus`: Modbus TCP transport and the seams used to replace it
//! - `registers`: Register reads and 32-bit assembly
//! - `status`: Status code catalog and session triggers
//! - `tag`: RFID tag decoding
//! - `energy`: kWh formatting
//! - `session`: Per-station session state machine
//! - `notifier`: Signal REST gateway client
//! - `session_log`: Append-only session records
//! - `driver`: The poll loop tying it all together

pub mod config;
pub mod driver;
pub mod energy;
pub mod error;
pub mod logging;
pub mod modbus;
pub mod notifier;
pub mod registers;
pub mod session;
pub mod session_log;
pub mod status;
pub mod tag;

/// Crate version, with the git sha when built from a checkout
pub const VERSION: &str = env!("APP_VERSION");

pub use config::Config;
pub use driver::{CycleReport, ShutdownHandle, StationPoller, Watcher, WatcherState};
pub use error::{Result, WallwatchError};
