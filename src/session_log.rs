//! Append-only session log
//!
//! One delimited file per station. Each session start or end appends a row
//! `date; time; station; status; tag; total_energy; charged_energy`.

use crate::config::{SessionLogConfig, check_strftime};
use crate::error::{Result, WallwatchError};
use crate::logging::{StructuredLogger, get_logger};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const HEADER: [&str; 7] = [
    "date",
    "time",
    "station",
    "status",
    "tag",
    "total_energy",
    "charged_energy",
];

/// One session event
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub station: String,
    pub status: String,
    pub tag: String,
    /// Formatted kWh, if the meter could be read
    pub total_energy: Option<String>,
    /// Formatted kWh of the finished session
    pub charged_energy: Option<String>,
}

/// Receives session records
#[async_trait::async_trait]
pub trait SessionLog: Send + Sync {
    async fn append(&self, record: &LogRecord) -> Result<()>;
}

/// Used when the session log is disabled
pub struct NullSessionLog;

#[async_trait::async_trait]
impl SessionLog for NullSessionLog {
    async fn append(&self, _record: &LogRecord) -> Result<()> {
        Ok(())
    }
}

/// Delimited text files under a directory, one per station
pub struct CsvSessionLog {
    directory: PathBuf,
    delimiter: char,
    date_format: String,
    time_format: String,
    header: bool,
    timezone: Tz,
    logger: StructuredLogger,
}

impl CsvSessionLog {
    pub fn new(config: &SessionLogConfig, timezone: &str) -> Result<Self> {
        let timezone: Tz = timezone.parse().map_err(|_| {
            WallwatchError::validation("locale.timezone", &format!("Unknown timezone '{}'", timezone))
        })?;
        check_strftime("session_log.date_format", &config.date_format)?;
        check_strftime("session_log.time_format", &config.time_format)?;
        let delimiter = config.delimiter.chars().next().ok_or_else(|| {
            WallwatchError::validation("session_log.delimiter", "Must be a single character")
        })?;
        Ok(Self {
            directory: PathBuf::from(&config.directory),
            delimiter,
            date_format: config.date_format.clone(),
            time_format: config.time_format.clone(),
            header: config.header,
            timezone,
            logger: get_logger("session_log"),
        })
    }

    /// File holding the rows of `station`
    pub fn path_for(&self, station: &str) -> PathBuf {
        let file_name: String = station
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.directory.join(format!("{}.csv", file_name))
    }

    fn field(&self, value: &str) -> String {
        value
            .chars()
            .map(|c| {
                if c == self.delimiter || c == '\n' || c == '\r' || c == '\0' {
                    ' '
                } else {
                    c
                }
            })
            .collect()
    }

    fn format_time(&self, local: &DateTime<Tz>, format: &str) -> Result<String> {
        let mut out = String::new();
        write!(out, "{}", local.format(format)).map_err(|_| {
            WallwatchError::config(format!("Cannot render timestamp with '{}'", format))
        })?;
        Ok(out)
    }

    /// Render a record as one line, without the newline
    pub fn format_row(&self, record: &LogRecord) -> Result<String> {
        let local = record.timestamp.with_timezone(&self.timezone);
        let fields = [
            self.format_time(&local, &self.date_format)?,
            self.format_time(&local, &self.time_format)?,
            self.field(&record.station),
            self.field(&record.status),
            self.field(&record.tag),
            record.total_energy.clone().unwrap_or_default(),
            record.charged_energy.clone().unwrap_or_default(),
        ];
        Ok(fields.join(&self.delimiter.to_string()))
    }

    async fn ensure_file(&self, path: &Path) -> Result<bool> {
        tokio::fs::create_dir_all(&self.directory).await?;
        Ok(tokio::fs::try_exists(path).await?)
    }
}

#[async_trait::async_trait]
impl SessionLog for CsvSessionLog {
    async fn append(&self, record: &LogRecord) -> Result<()> {
        let path = self.path_for(&record.station);
        let existed = self.ensure_file(&path).await?;

        let mut out = String::new();
        if !existed && self.header {
            out.push_str(&HEADER.join(&self.delimiter.to_string()));
            out.push('\n');
        }
        out.push_str(&self.format_row(record)?);
        out.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(out.as_bytes()).await?;
        file.flush().await?;

        self.logger
            .debug(&format!("Appended session record to {}", path.display()));
        Ok(())
    }
}
