//! Charging session tracking
//!
//! The tracker is an edge-triggered latch on the last observed status.
//! Repeated readings of the same status do nothing. A change produces a
//! notification, and when the new status opens or closes a session the
//! tracker performs the extra meter and tag reads and emits a log record.

use crate::config::RegistersConfig;
use crate::energy::{delivered_since, format_charged, format_kwh};
use crate::error::{Result, WallwatchError};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::registers::RegisterReader;
use crate::session_log::LogRecord;
use crate::status::{SessionTransition, SessionTriggers, StationStatus};
use crate::tag::{self, RfidTag};
use chrono::Utc;

/// State carried from one poll to the next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Last status seen; `None` until the first successful status read
    pub last_status: Option<StationStatus>,

    /// Meter total when the running session started
    pub session_start_energy_wh: Option<u32>,
}

/// A status that differs from the previous poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub status: StationStatus,
    pub code: u32,
    pub transition: SessionTransition,
}

/// Result of a status change: message text and optional log row
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub change: StatusChange,
    pub message: String,
    pub record: Option<LogRecord>,
}

/// Tracker settings that do not change at runtime
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub station: String,
    /// Prefix messages with `[station]`
    pub show_station: bool,
    pub triggers: SessionTriggers,
    pub decimal_separator: char,
    pub registers: RegistersConfig,
}

/// Per-station session state machine
pub struct SessionTracker {
    settings: TrackerSettings,
    state: SessionState,
    logger: StructuredLogger,
}

impl SessionTracker {
    pub fn new(settings: TrackerSettings) -> Self {
        let logger =
            get_logger_with_context(LogContext::new("session").with_station(&settings.station));
        Self {
            settings,
            state: SessionState::default(),
            logger,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn station(&self) -> &str {
        &self.settings.station
    }

    /// Latch a freshly read status code. Returns the change, if any.
    ///
    /// `last_status` is updated before anything else happens so a failure
    /// in later reads cannot make the same change fire again.
    pub fn observe(&mut self, code: u32) -> Option<StatusChange> {
        let status = StationStatus::from_code(code);
        self.logger.debug(&format!(
            "The status is {}. Last status is {}",
            status,
            self.state
                .last_status
                .map_or("none", |s| s.name())
        ));

        if self.state.last_status == Some(status) {
            return None;
        }
        self.state.last_status = Some(status);

        Some(StatusChange {
            status,
            code,
            transition: status.session_transition(&self.settings.triggers),
        })
    }

    /// Handle one successful status read, performing session reads as needed
    pub async fn on_status(
        &mut self,
        code: u32,
        reader: &mut RegisterReader<'_>,
    ) -> Option<SessionEvent> {
        let change = self.observe(code)?;
        self.logger.info(&format!(
            "Status changed to {} ({})",
            change.status, change.code
        ));

        let mut lines = vec![format!(
            "Your charging point status is {} ({})",
            change.status, change.code
        )];

        let record = match change.transition {
            SessionTransition::Started => Some(self.session_started(reader, &mut lines).await),
            SessionTransition::Ended => Some(self.session_ended(reader, &mut lines).await),
            SessionTransition::None => None,
        };

        let mut message = lines.join("\n");
        if self.settings.show_station {
            message = format!("[{}] {}", self.settings.station, message);
        }

        Some(SessionEvent {
            change,
            message,
            record,
        })
    }

    async fn session_started(
        &mut self,
        reader: &mut RegisterReader<'_>,
        lines: &mut Vec<String>,
    ) -> LogRecord {
        let sep = self.settings.decimal_separator;

        let total = self.read_energy(reader, "total energy", true).await;
        self.state.session_start_energy_wh = total;
        let total_text = total.map(|wh| format_kwh(wh, sep));
        if let Some(ref text) = total_text {
            lines.push(format!("Total energy: {} kWh", text));
        }

        let tag = self.read_tag(reader).await;
        if tag.is_present() {
            lines.push(format!("Tag: {}", tag.printable()));
        }

        self.record(tag, total_text, None)
    }

    async fn session_ended(
        &mut self,
        reader: &mut RegisterReader<'_>,
        lines: &mut Vec<String>,
    ) -> LogRecord {
        let sep = self.settings.decimal_separator;

        let total = self.read_energy(reader, "total energy", true).await;
        let charged = match self.read_energy(reader, "charged energy", false).await {
            Some(wh) => Some(wh),
            None => {
                let derived = self
                    .state
                    .session_start_energy_wh
                    .zip(total)
                    .and_then(|(start, now)| delivered_since(start, now));
                if let Some(wh) = derived {
                    self.logger.info(&format!(
                        "Using meter difference of {} Wh as charged energy",
                        wh
                    ));
                }
                derived
            }
        };
        self.state.session_start_energy_wh = None;

        let total_text = total.map(|wh| format_kwh(wh, sep));
        let charged_text = charged.map(|wh| format_charged(wh, sep));
        if let Some(ref text) = total_text {
            lines.push(format!("Total energy: {} kWh", text));
        }
        if let Some(ref text) = charged_text {
            lines.push(format!("Charged energy: {} kWh", text));
        }

        let tag = self.read_tag(reader).await;
        lines.push(format!("Tag: {}", tag.printable()));

        self.record(tag, total_text, charged_text)
    }

    fn record(
        &self,
        tag: RfidTag,
        total_energy: Option<String>,
        charged_energy: Option<String>,
    ) -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            station: self.settings.station.clone(),
            status: self
                .state
                .last_status
                .map_or(crate::status::UNKNOWN_STATUS, |s| s.name())
                .to_string(),
            tag: tag.printable().to_string(),
            total_energy,
            charged_energy,
        }
    }

    async fn read_energy(
        &self,
        reader: &mut RegisterReader<'_>,
        what: &str,
        total: bool,
    ) -> Option<u32> {
        let spec = if total {
            self.settings.registers.total_energy
        } else {
            self.settings.registers.charged_energy
        };
        let result: Result<u32> = reader.read_spec(spec).await;
        match result {
            Ok(wh) => {
                self.logger.debug(&format!("Read {}: {} Wh", what, wh));
                Some(wh)
            }
            Err(e @ WallwatchError::UnsupportedLength { .. }) => {
                self.logger
                    .error(&format!("Register map for {} is invalid: {}", what, e));
                None
            }
            Err(e) => {
                self.logger.warn(&format!("Could not read {}: {}", what, e));
                None
            }
        }
    }

    async fn read_tag(&self, reader: &mut RegisterReader<'_>) -> RfidTag {
        let read = tag::decode(reader, &self.settings.registers.idtag).await;
        if read.failed_chunks > 0 {
            self.logger.warn(&format!(
                "{} of 5 tag chunks could not be read",
                read.failed_chunks
            ));
        }
        read.tag
    }
}
