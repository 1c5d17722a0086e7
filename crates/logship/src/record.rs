//! The structured log record shared by every sink.
//!
//! A record is built once per log call that passes the severity filter and
//! is never mutated afterwards. The same serialized shape is used for the
//! remote wire format (elements of the POSTed JSON array) and for the
//! durable queue (one JSON line per record), so a record that was persisted
//! on delivery failure deserializes back to a value deep-equal to the
//! original.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::log_level::LogLevel;

/// One structured log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// RFC 3339 UTC timestamp, rendered at creation.
    pub timestamp: String,
    /// Severity of the record.
    pub level: LogLevel,
    /// Optional label identifying the emitting service or component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The log message.
    pub message: String,
    /// Optional structured context attached by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl EventRecord {
    /// Builds a record stamped with the current time.
    #[must_use]
    pub fn new(
        level: LogLevel,
        label: Option<String>,
        message: String,
        context: Option<Value>,
    ) -> Self {
        EventRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            label,
            message,
            context,
        }
    }
}
