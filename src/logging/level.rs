use crate::error::{Result, WallwatchError};
use tracing::Level;

/// Parse a level name; accepts the Python-style `WARNING` and `CRITICAL` too
pub fn parse_log_level(level_str: &str) -> Result<Level> {
    match level_str.trim().to_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" | "CRITICAL" => Ok(Level::ERROR),
        _ => Err(WallwatchError::config(format!(
            "Invalid log level: {}",
            level_str
        ))),
    }
}
