//! Configuration management for Wallwatch
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{Result, WallwatchError};
use crate::status::{SessionTriggers, StationStatus};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

mod defaults;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default Modbus TCP connection parameters
    pub modbus: ModbusConfig,

    /// Stations to watch, polled one after the other
    pub stations: Vec<StationConfig>,

    /// Modbus register map
    pub registers: RegistersConfig,

    /// Statuses that open and close a charging session
    pub session: SessionConfig,

    /// Signal REST gateway
    pub signal: SignalConfig,

    /// Append-only session log
    pub session_log: SessionLogConfig,

    /// Number and date rendering
    pub locale: LocaleConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Seconds to sleep between poll iterations
    pub poll_interval_secs: u64,
}

/// Modbus TCP connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModbusConfig {
    /// Host name or IP address of the charging station controller
    pub host: String,

    /// TCP port (typically 502)
    pub port: u16,

    /// Unit (slave) id
    pub unit_id: u8,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Per-request timeout in milliseconds
    pub operation_timeout_ms: u64,

    /// Pause before every register read, for controllers that choke on
    /// back-to-back requests
    pub read_delay_ms: u64,
}

/// One watched station; unset fields fall back to [`ModbusConfig`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    pub name: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub unit_id: Option<u8>,
}

/// Station with every connection parameter filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStation {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
}

/// Location and width of a register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSpec {
    pub address: u16,
    pub length: u16,
}

/// Modbus register address mappings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistersConfig {
    /// Connector status code
    pub status: RegisterSpec,

    /// Meter total in Wh
    pub total_energy: RegisterSpec,

    /// Energy of the current/last session in Wh
    pub charged_energy: RegisterSpec,

    /// RFID tag, four ASCII bytes per entry
    pub idtag: [RegisterSpec; 5],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Entering this status starts a session
    pub start_status: StationStatus,

    /// Entering this status ends a session
    pub end_status: StationStatus,
}

/// Signal REST gateway (signal-cli-rest-api)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub host: String,
    pub port: u16,

    /// Sender number registered with the gateway
    pub own_number: String,

    /// Numbers receiving the notifications
    pub recipients: Vec<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLogConfig {
    pub enabled: bool,

    /// Directory holding one file per station
    pub directory: String,

    /// Field delimiter
    pub delimiter: String,

    /// chrono format for the date column
    pub date_format: String,

    /// chrono format for the time column
    pub time_format: String,

    /// Write a header row when a file is created
    pub header: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    /// Decimal separator for kWh figures
    pub decimal_separator: String,

    /// IANA timezone for log timestamps
    pub timezone: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file; empty disables file logging
    pub file: String,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,

    /// Number of rotated files to keep
    pub backup_count: u32,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "wallwatch.yaml",
            "/data/wallwatch.yaml",
            "/etc/wallwatch/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value.trim().parse::<T>().map_err(|_| {
                WallwatchError::validation(key, &format!("cannot parse '{}'", value))
            })
        }

        if let Some(v) = lookup("MODBUS_HOST") {
            self.modbus.host = v;
        }
        if let Some(v) = lookup("MODBUS_PORT") {
            self.modbus.port = parse("MODBUS_PORT", &v)?;
        }
        if let Some(v) = lookup("MODBUS_REGISTER") {
            self.registers.status.address = parse("MODBUS_REGISTER", &v)?;
        }
        if let Some(v) = lookup("SIGNAL_HOST") {
            self.signal.host = v;
        }
        if let Some(v) = lookup("SIGNAL_PORT") {
            self.signal.port = parse("SIGNAL_PORT", &v)?;
        }
        if let Some(v) = lookup("SIGNAL_OWN_NUMBER") {
            self.signal.own_number = v;
        }
        if let Some(v) = lookup("SIGNAL_SEND_NUMBER") {
            self.signal.recipients = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("FREQUENCY") {
            self.poll_interval_secs = parse("FREQUENCY", &v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }

    /// Stations with connection defaults applied
    pub fn resolved_stations(&self) -> Vec<ResolvedStation> {
        self.stations
            .iter()
            .map(|s| ResolvedStation {
                name: s.name.clone(),
                host: s.host.clone().unwrap_or_else(|| self.modbus.host.clone()),
                port: s.port.unwrap_or(self.modbus.port),
                unit_id: s.unit_id.unwrap_or(self.modbus.unit_id),
            })
            .collect()
    }

    pub fn session_triggers(&self) -> SessionTriggers {
        SessionTriggers {
            start: self.session.start_status,
            end: self.session.end_status,
        }
    }

    /// Decimal separator as a char; validated to be a single character
    pub fn decimal_separator(&self) -> char {
        self.locale.decimal_separator.chars().next().unwrap_or(',')
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.stations.is_empty() {
            return Err(WallwatchError::validation(
                "stations",
                "At least one station is required",
            ));
        }

        let mut seen = HashSet::new();
        for station in self.resolved_stations() {
            if station.name.trim().is_empty() {
                return Err(WallwatchError::validation(
                    "stations.name",
                    "Station name cannot be empty",
                ));
            }
            if !seen.insert(station.name.clone()) {
                return Err(WallwatchError::validation(
                    "stations.name",
                    &format!("Duplicate station name '{}'", station.name),
                ));
            }
            if station.host.is_empty() {
                return Err(WallwatchError::validation(
                    "modbus.host",
                    "Host cannot be empty",
                ));
            }
            if station.port == 0 {
                return Err(WallwatchError::validation(
                    "modbus.port",
                    "Port must be greater than 0",
                ));
            }
        }

        let r = &self.registers;
        let mut specs = vec![
            ("registers.status", r.status),
            ("registers.total_energy", r.total_energy),
            ("registers.charged_energy", r.charged_energy),
        ];
        specs.extend(r.idtag.iter().map(|s| ("registers.idtag", *s)));
        for (field, spec) in specs {
            if spec.length != 1 && spec.length != 2 {
                return Err(WallwatchError::validation(
                    field,
                    &format!("Length must be 1 or 2, got {}", spec.length),
                ));
            }
        }

        if self.session.start_status == StationStatus::Unknown
            || self.session.end_status == StationStatus::Unknown
        {
            return Err(WallwatchError::validation(
                "session",
                "Trigger statuses must be known status names",
            ));
        }
        if self.session.start_status == self.session.end_status {
            return Err(WallwatchError::validation(
                "session",
                "Start and end status must differ",
            ));
        }

        if self.signal.host.is_empty() {
            return Err(WallwatchError::validation(
                "signal.host",
                "Host cannot be empty",
            ));
        }
        if self.signal.port == 0 {
            return Err(WallwatchError::validation(
                "signal.port",
                "Port must be greater than 0",
            ));
        }

        if self.signal.own_number.trim().is_empty() {
            return Err(WallwatchError::validation(
                "signal.own_number",
                "Sender number is required",
            ));
        }
        if self.signal.recipients.iter().all(|r| r.trim().is_empty()) {
            return Err(WallwatchError::validation(
                "signal.recipients",
                "At least one recipient is required",
            ));
        }

        if self.locale.decimal_separator.chars().count() != 1 {
            return Err(WallwatchError::validation(
                "locale.decimal_separator",
                "Must be a single character",
            ));
        }
        if self.locale.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(WallwatchError::validation(
                "locale.timezone",
                &format!("Unknown timezone '{}'", self.locale.timezone),
            ));
        }
        if self.session_log.delimiter.chars().count() != 1 {
            return Err(WallwatchError::validation(
                "session_log.delimiter",
                "Must be a single character",
            ));
        }

        check_strftime("session_log.date_format", &self.session_log.date_format)?;
        check_strftime("session_log.time_format", &self.session_log.time_format)?;

        crate::logging::parse_log_level(&self.logging.level)?;

        if self.poll_interval_secs == 0 {
            return Err(WallwatchError::validation(
                "poll_interval_secs",
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Reject chrono format strings with unknown specifiers
pub(crate) fn check_strftime(field: &str, format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(WallwatchError::validation(
            field,
            &format!("Invalid date/time format '{}'", format),
        ));
    }
    Ok(())
}
