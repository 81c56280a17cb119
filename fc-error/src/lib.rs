//! Unified error handling for fanctrl
//!
//! This crate provides the single error type used by the core library and the daemon.
//! It uses thiserror for ergonomic error definitions with proper Display and Error trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using FanctrlError
pub type Result<T> = std::result::Result<T, FanctrlError>;

/// Unified error type for all fanctrl operations
#[derive(thiserror::Error, Debug)]
pub enum FanctrlError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Sensor Errors
    // ============================================================================
    #[error("Failed to read temperature from {path}: {reason}")]
    TemperatureRead {
        path: PathBuf,
        reason: String,
    },

    #[error("Sensor read task failed: {0}")]
    SensorTask(String),

    // ============================================================================
    // GPIO Errors
    // ============================================================================
    #[error("GPIO chip not found: {0}")]
    GpioChipNotFound(PathBuf),

    #[error("GPIO line request failed: chip={chip} pin={pin}: {reason}")]
    GpioRequest {
        chip: String,
        pin: u32,
        reason: String,
    },

    #[error("Failed to write GPIO {path}: {source}")]
    GpioWrite {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },
}

impl FanctrlError {
    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a temperature read error
    pub fn temperature(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::TemperatureRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Exit status the daemon uses when this error aborts startup
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig { .. }
            | Self::GpioChipNotFound(_)
            | Self::GpioRequest { .. }
            | Self::GpioWrite { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_exit_codes() {
        assert_eq!(FanctrlError::invalid_config("poll_interval_s", "must be > 0").exit_code(), 2);
        assert_eq!(FanctrlError::GpioChipNotFound("/dev/gpiochip9".into()).exit_code(), 2);
        assert_eq!(FanctrlError::temperature("/tmp/t", "empty").exit_code(), 1);
    }

    #[test]
    fn test_display_includes_context() {
        let err = FanctrlError::GpioRequest {
            chip: "gpiochip0".to_string(),
            pin: 33,
            reason: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "GPIO line request failed: chip=gpiochip0 pin=33: busy");
    }
}
