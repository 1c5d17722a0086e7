//! # logship
//!
//! A process-local structured logger that renders records to the console,
//! optionally persists them to size-rotated files, and optionally ships
//! batches to a remote collector over HTTP(S) with gzip, retry/backoff, and
//! a disk-backed durability queue.
//!
//! ## Overview
//!
//! The crate is organized around one record type flowing into three sinks:
//! - [`formatter`]: plain or JSON rendering, with optional ANSI color
//! - [`file_sink`]: append-only files rotated by size
//! - [`remote`]: batching, flush scheduling, HTTP delivery, and durability
//!
//! Logging calls never block on the network and never return errors; remote
//! delivery failures are handled entirely inside the pipeline, visible only
//! through backoff, the durable queue, and (past the buffer cap) dropped
//! records.
//!
//! ## Example
//!
//! ```rust,no_run
//! use logship::config::{Config, RemoteConfig};
//! use logship::logger::Logger;
//!
//! #[tokio::main]
//! async fn main() {
//!     let logger = Logger::new(Config {
//!         remote: Some(RemoteConfig {
//!             url: "https://collector.example.com/v1/logs".to_string(),
//!             ..RemoteConfig::default()
//!         }),
//!         ..Config::default()
//!     });
//!
//!     logger.info("service started");
//!     logger.shutdown().await;
//! }
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]

/// Configuration for the logger and the remote delivery pipeline
pub mod config;

/// Size-rotated append-only file sink
pub mod file_sink;

/// Rendering of records into console and file lines
pub mod formatter;

/// The logging front end
pub mod logger;

/// The structured log record shared by every sink
pub mod record;

/// Batching, flush scheduling, HTTP delivery, and durability
pub mod remote;

pub use config::log_level::LogLevel;
pub use config::Config;
pub use logger::Logger;
pub use record::EventRecord;
