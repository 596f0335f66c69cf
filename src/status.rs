//! Charging station status catalog
//!
//! The controller exposes its connector state as a small integer in the
//! status register. The table follows the OCPP connector states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name used for every code outside the catalog
pub const UNKNOWN_STATUS: &str = "unknown";

/// Connector status reported by the station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationStatus {
    Available,
    Occupied,
    Reserved,
    Unavailable,
    Faulted,
    Preparing,
    Charging,
    SuspendedEvse,
    SuspendedEv,
    Finishing,
    #[serde(other)]
    Unknown,
}

/// What a status change means for the charging session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    Started,
    Ended,
    None,
}

impl StationStatus {
    /// Map a raw register value to a status. Total over the input domain.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => StationStatus::Available,
            1 => StationStatus::Occupied,
            2 => StationStatus::Reserved,
            3 => StationStatus::Unavailable,
            4 => StationStatus::Faulted,
            5 => StationStatus::Preparing,
            6 => StationStatus::Charging,
            7 => StationStatus::SuspendedEvse,
            8 => StationStatus::SuspendedEv,
            9 => StationStatus::Finishing,
            _ => StationStatus::Unknown,
        }
    }

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            StationStatus::Available => "available",
            StationStatus::Occupied => "occupied",
            StationStatus::Reserved => "reserved",
            StationStatus::Unavailable => "unavailable",
            StationStatus::Faulted => "faulted",
            StationStatus::Preparing => "preparing",
            StationStatus::Charging => "charging",
            StationStatus::SuspendedEvse => "suspendedevse",
            StationStatus::SuspendedEv => "suspendedev",
            StationStatus::Finishing => "finishing",
            StationStatus::Unknown => UNKNOWN_STATUS,
        }
    }

    /// Session meaning of entering this status under the given triggers
    pub fn session_transition(&self, triggers: &SessionTriggers) -> SessionTransition {
        if *self == triggers.start {
            SessionTransition::Started
        } else if *self == triggers.end {
            SessionTransition::Ended
        } else {
            SessionTransition::None
        }
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status catalog lookup by raw integer
pub fn lookup(code: i64) -> &'static str {
    u32::try_from(code)
        .map(StationStatus::from_code)
        .unwrap_or(StationStatus::Unknown)
        .name()
}

/// Statuses whose arrival opens or closes a charging session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTriggers {
    pub start: StationStatus,
    pub end: StationStatus,
}

impl Default for SessionTriggers {
    fn default() -> Self {
        Self {
            start: StationStatus::Charging,
            end: StationStatus::Available,
        }
    }
}
