//! Error types and handling for Wallwatch
//!
//! Every failure inside a poll iteration is expressed as a
//! [`WallwatchError`] and caught at the iteration boundary; only startup
//! failures escape to the binary.

use thiserror::Error;

/// Result type alias for Wallwatch operations
pub type Result<T> = std::result::Result<T, WallwatchError>;

/// Main error type for Wallwatch
#[derive(Debug, Error)]
pub enum WallwatchError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Register transport could not be reached
    #[error("Connect error: {message}")]
    Connect { message: String },

    /// A single register read failed (transport or exception response)
    #[error("Read error: {message}")]
    Read { message: String },

    /// Register reads only assemble 16 or 32 bit values
    #[error("Unsupported register length {length} at address {address}")]
    UnsupportedLength { address: u16, length: u16 },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Notification sink unreachable or rejected the message
    #[error("Notify error: {message}")]
    Notify { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl WallwatchError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        WallwatchError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        WallwatchError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new connect error
    pub fn connect<S: Into<String>>(message: S) -> Self {
        WallwatchError::Connect {
            message: message.into(),
        }
    }

    /// Create a new read error
    pub fn read<S: Into<String>>(message: S) -> Self {
        WallwatchError::Read {
            message: message.into(),
        }
    }

    pub fn unsupported_length(address: u16, length: u16) -> Self {
        WallwatchError::UnsupportedLength { address, length }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        WallwatchError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new notify error
    pub fn notify<S: Into<String>>(message: S) -> Self {
        WallwatchError::Notify {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        WallwatchError::Io {
            message: message.into(),
        }
    }

    /// Connection-level failures that leave the transport unusable
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            WallwatchError::Connect { .. } | WallwatchError::Timeout { .. }
        )
    }
}

impl From<std::io::Error> for WallwatchError {
    fn from(err: std::io::Error) -> Self {
        WallwatchError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for WallwatchError {
    fn from(err: serde_yaml::Error) -> Self {
        WallwatchError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for WallwatchError {
    fn from(err: serde_json::Error) -> Self {
        WallwatchError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for WallwatchError {
    fn from(err: reqwest::Error) -> Self {
        WallwatchError::notify(err.to_string())
    }
}

impl From<chrono::ParseError> for WallwatchError {
    fn from(err: chrono::ParseError) -> Self {
        WallwatchError::validation("datetime", &err.to_string())
    }
}
