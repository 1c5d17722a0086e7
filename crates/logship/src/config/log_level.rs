//! Severity levels and the active-level filter.
//!
//! This module defines the `LogLevel` enum and provides parsing from strings
//! (case-insensitive) and deserialization from config files.
//!
//! # Levels
//!
//! Four levels, ordered from most to least severe:
//! - **ERROR**: serious failures that need attention
//! - **WARN**: hazardous situations that may lead to errors
//! - **INFO**: useful information about normal operation (default)
//! - **DEBUG**: lower priority diagnostic detail
//!
//! A record passes the filter when its level is at or above the configured
//! threshold: a logger set to `Warn` emits `Error` and `Warn` records only.
//!
//! # Default
//!
//! If no level is specified or an invalid value is provided, the logger
//! defaults to **INFO**.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::error;

/// Severity of a log record, also used as the logger's threshold.
///
/// # Parsing
///
/// Levels parse from strings case-insensitively:
/// ```
/// use logship::config::log_level::LogLevel;
/// use std::str::FromStr;
///
/// assert_eq!(LogLevel::from_str("debug").unwrap(), LogLevel::Debug);
/// assert_eq!(LogLevel::from_str("ERROR").unwrap(), LogLevel::Error);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Serious failures that need attention.
    Error,
    /// Hazardous situations that may lead to errors.
    Warn,
    /// Useful information about normal operation. This is the **default**.
    #[default]
    Info,
    /// Lower priority diagnostic detail.
    Debug,
}

impl AsRef<str> for LogLevel {
    fn as_ref(&self) -> &str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl LogLevel {
    /// Returns true when a record at this level passes a logger configured
    /// with `threshold`.
    ///
    /// ```
    /// use logship::config::log_level::LogLevel;
    ///
    /// assert!(LogLevel::Error.enabled_for(LogLevel::Warn));
    /// assert!(!LogLevel::Debug.enabled_for(LogLevel::Info));
    /// ```
    #[must_use]
    pub fn enabled_for(self, threshold: LogLevel) -> bool {
        self.rank() <= threshold.rank()
    }

    fn rank(self) -> u8 {
        match self {
            LogLevel::Error => 0,
            LogLevel::Warn => 1,
            LogLevel::Info => 2,
            LogLevel::Debug => 3,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(format!(
                "Invalid log level: '{s}'. Valid levels are: error, warn, info, debug",
            )),
        }
    }
}

/// Lenient deserialization: invalid or non-string input logs an error and
/// falls back to the default level, so a bad config value never prevents the
/// logger from starting.
impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        if let Value::String(s) = value {
            match LogLevel::from_str(&s) {
                Ok(level) => Ok(level),
                Err(e) => {
                    error!("{}", e);
                    Ok(LogLevel::default())
                }
            }
        } else {
            error!("Expected a string for log level, got {:?}", value);
            Ok(LogLevel::default())
        }
    }
}
