//! Configuration for the logger, file sink, and remote delivery pipeline.
//!
//! All options deserialize with `#[serde(default)]` so a partial config file
//! (or a plain `Config::default()`) yields a working logger. Parsing is
//! lenient where it can be: an invalid log level falls back to the default
//! rather than failing startup, and a malformed remote URL disables delivery
//! instead of erroring (see `remote::transport`).
//!
//! Durations are carried as millisecond integers, matching the option names
//! callers configure (`interval_ms`, `timeout_ms`), with `Duration` accessors
//! for the code that consumes them.

pub mod log_level;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::config::log_level::LogLevel;

/// Default period between flush checks, in milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;

/// Default number of records per flush attempt and per durable-queue drain.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default per-request delivery timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default cap on the in-memory buffer applied after a failed-delivery
/// reinsertion.
pub const DEFAULT_MAX_BUFFER: usize = 1_000;

/// Default durable-queue location used when `reliable` is set without an
/// explicit `queue_path`.
pub const DEFAULT_QUEUE_PATH: &str = "logship-queue.jsonl";

/// Default size threshold at which the file sink rotates, in bytes (5 MiB).
pub const DEFAULT_FILE_MAX_SIZE: u64 = 5 * 1_024 * 1_024;

/// Default number of rotated backup files kept beside the live log file.
pub const DEFAULT_FILE_MAX_FILES: usize = 5;

/// Top-level logger configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum severity a record needs to be emitted at all.
    pub level: LogLevel,
    /// Optional label stamped on every record (service or component name).
    pub label: Option<String>,
    /// Render JSON lines instead of plain text.
    pub json: bool,
    /// ANSI-color the level token on console output.
    pub color: bool,
    /// Local file sink; absent means console-only.
    pub file: Option<FileConfig>,
    /// Remote delivery; absent disables the remote pipeline entirely.
    pub remote: Option<RemoteConfig>,
}

/// Rotating file sink configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Path of the live log file. Parent directories are created on demand.
    pub path: PathBuf,
    /// Rotation threshold in bytes. Zero disables rotation.
    pub max_size_bytes: u64,
    /// How many rotated backups (`path.1` .. `path.N`) to keep.
    pub max_files: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        FileConfig {
            path: PathBuf::from("logship.log"),
            max_size_bytes: DEFAULT_FILE_MAX_SIZE,
            max_files: DEFAULT_FILE_MAX_FILES,
        }
    }
}

/// Remote delivery configuration.
///
/// The pipeline batches records in memory, POSTs them as a JSON array to
/// `url` on a recurring interval (or as soon as `batch_size` records are
/// pending), and retries failed deliveries with exponential backoff. With
/// `reliable` set, failed batches are persisted to a newline-delimited JSON
/// file instead of being held in memory, so they survive process restarts.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Collector endpoint. An unparseable URL disables delivery (flushes
    /// become no-ops) rather than failing the logger.
    pub url: String,
    /// Period between flush checks, in milliseconds.
    pub interval_ms: u64,
    /// Records per flush attempt and per durable-queue drain.
    pub batch_size: usize,
    /// Static headers merged into every request (auth tokens and the like).
    pub headers: HashMap<String, String>,
    /// Per-request timeout, in milliseconds. A timed-out request is aborted
    /// and handled like any other transport failure.
    pub timeout_ms: u64,
    /// Cap applied to the in-memory buffer after a failed-delivery
    /// reinsertion; records beyond the cap are dropped, oldest kept.
    pub max_buffer: usize,
    /// Persist failed batches to the durable queue instead of reinserting
    /// them in memory.
    pub reliable: bool,
    /// Durable queue file location. Defaults to [`DEFAULT_QUEUE_PATH`] when
    /// `reliable` is set without a path.
    pub queue_path: Option<PathBuf>,
    /// Gzip request bodies and mark them with `Content-Encoding: gzip`.
    pub gzip: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            url: String::new(),
            interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            headers: HashMap::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_buffer: DEFAULT_MAX_BUFFER,
            reliable: false,
            queue_path: None,
            gzip: false,
        }
    }
}

impl RemoteConfig {
    /// The flush-check period as a [`Duration`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// The per-request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The effective durable queue path.
    #[must_use]
    pub fn queue_file(&self) -> PathBuf {
        self.queue_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_QUEUE_PATH))
    }
}
