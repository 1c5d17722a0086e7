//! The logging front end tying the sinks together.
//!
//! A `Logger` renders each record for the console, appends it to the
//! rotating file sink when one is configured, and hands it to the remote
//! delivery service when that is configured. Logging calls are synchronous
//! and infallible: remote delivery is a non-blocking channel send, and every
//! sink swallows its own failures.

use serde_json::Value;
use tracing::warn;

use crate::config::log_level::LogLevel;
use crate::config::Config;
use crate::file_sink::FileSink;
use crate::formatter;
use crate::record::EventRecord;
use crate::remote::{RemoteHandle, RemoteService};

/// Process-local structured logger.
///
/// With remote delivery configured, `Logger::new` spawns the delivery
/// service onto the current Tokio runtime, so it must be called from within
/// one in that case. Console- and file-only loggers have no such
/// requirement.
pub struct Logger {
    level: LogLevel,
    label: Option<String>,
    json: bool,
    color: bool,
    file: Option<FileSink>,
    remote: Option<RemoteHandle>,
}

impl Logger {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let file = config.file.as_ref().and_then(|file_config| {
            match FileSink::new(file_config) {
                Ok(sink) => Some(sink),
                Err(err) => {
                    warn!(error = %err, "could not open log file; file sink disabled");
                    None
                }
            }
        });

        let remote = config.remote.map(|remote_config| {
            let (service, handle) = RemoteService::new(remote_config);
            tokio::spawn(service.run());
            handle
        });

        Logger {
            level: config.level,
            label: config.label,
            json: config.json,
            color: config.color,
            file,
            remote,
        }
    }

    /// Emits a record at the given level with optional structured context.
    pub fn log(&self, level: LogLevel, message: impl Into<String>, context: Option<Value>) {
        if !level.enabled_for(self.level) {
            return;
        }

        let record = EventRecord::new(level, self.label.clone(), message.into(), context);

        if self.json {
            let line = formatter::render_json(&record);
            self.emit_console(level, &line);
            if let Some(sink) = &self.file {
                sink.write_line(&line);
            }
        } else {
            self.emit_console(level, &formatter::render_plain(&record, self.color));
            if let Some(sink) = &self.file {
                sink.write_line(&formatter::render_plain(&record, false));
            }
        }

        if let Some(remote) = &self.remote {
            remote.enqueue(record);
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, None);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, None);
    }

    /// Forces one remote flush of any buffered records and waits for the
    /// attempt (plus a short grace period) to settle. A way to wait for
    /// in-flight delivery before process exit; no-op without remote
    /// delivery.
    pub async fn flush_remote(&self) {
        if let Some(remote) = &self.remote {
            remote.flush().await;
        }
    }

    /// Re-submits up to one batch of durably queued records through the
    /// delivery pipeline. No-op without remote delivery.
    pub async fn drain_queue(&self) {
        if let Some(remote) = &self.remote {
            remote.drain_queue().await;
        }
    }

    /// Stops the remote delivery service after a final best-effort flush of
    /// buffered records. Durably queued records stay on disk.
    pub async fn shutdown(&self) {
        if let Some(remote) = &self.remote {
            remote.shutdown().await;
        }
    }

    fn emit_console(&self, level: LogLevel, line: &str) {
        if matches!(level, LogLevel::Error) {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}
