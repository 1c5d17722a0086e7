//! Rendering of records into console and file lines.
//!
//! Two formats: a plain text line with an optionally ANSI-colored level
//! token, and a single JSON line (the record's serde serialization). Both
//! are pure string functions; the sinks decide where the line goes.

use crate::config::log_level::LogLevel;
use crate::record::EventRecord;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_CYAN: &str = "\x1b[36m";
const ANSI_RESET: &str = "\x1b[0m";

fn level_color(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => ANSI_RED,
        LogLevel::Warn => ANSI_YELLOW,
        LogLevel::Info => ANSI_GREEN,
        LogLevel::Debug => ANSI_CYAN,
    }
}

/// Renders `TIMESTAMP LEVEL [label] message {context}`.
///
/// With `color` set, the level token is wrapped in ANSI escapes; everything
/// else stays uncolored so lines remain grep-friendly.
#[must_use]
pub fn render_plain(record: &EventRecord, color: bool) -> String {
    let level = record.level.as_ref();
    let mut line = if color {
        format!(
            "{} {}{}{}",
            record.timestamp,
            level_color(record.level),
            level,
            ANSI_RESET
        )
    } else {
        format!("{} {}", record.timestamp, level)
    };

    if let Some(label) = &record.label {
        line.push_str(&format!(" [{label}]"));
    }
    line.push(' ');
    line.push_str(&record.message);

    if let Some(context) = &record.context {
        line.push(' ');
        line.push_str(&context.to_string());
    }
    line
}

/// Renders the record as one JSON line.
///
/// Serialization of a record built by this crate cannot fail (all fields are
/// JSON-representable); the empty-string fallback exists so a formatter bug
/// can never panic the host application.
#[must_use]
pub fn render_json(record: &EventRecord) -> String {
    serde_json::to_string(record).unwrap_or_default()
}
