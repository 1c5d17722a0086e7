//! Disk-backed durability queue for undelivered batches.
//!
//! The queue is a UTF-8 text file with one JSON-serialized record per line,
//! append-only under normal operation. Draining removes a prefix of lines
//! and rewrites the file with the remainder in place; a crash between the
//! read and the rewrite can duplicate or lose the drained prefix. That
//! window is a known limitation of the format, accepted in exchange for the
//! file staying trivially inspectable, and the queue assumes a single writer
//! per path.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;

use crate::record::EventRecord;

/// Failure while appending to or draining the queue file.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt queue record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Append-only record log at a caller-configured path.
#[derive(Debug, Clone)]
pub struct DurableQueue {
    path: PathBuf,
}

impl DurableQueue {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        DurableQueue { path }
    }

    /// The queue file location.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Appends records as JSON lines, creating the parent directory and the
    /// file on demand. An empty slice is a no-op and touches nothing.
    pub fn append(&self, records: &[EventRecord]) -> Result<(), QueueError> {
        if records.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut lines = String::new();
        for record in records {
            lines.push_str(&serde_json::to_string(record)?);
            lines.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(lines.as_bytes())?;
        Ok(())
    }

    /// Removes up to `max_count` records from the head of the queue and
    /// returns them, rewriting the file with whatever remains.
    ///
    /// A missing or empty file yields an empty result. All drained lines are
    /// parsed before the file is touched, so a corrupt line fails the whole
    /// drain and leaves the queue exactly as it was.
    pub fn drain(&self, max_count: usize) -> Result<Vec<EventRecord>, QueueError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let lines: Vec<&str> = contents.lines().collect();
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let take = max_count.min(lines.len());
        let mut drained = Vec::with_capacity(take);
        for line in &lines[..take] {
            drained.push(serde_json::from_str(line)?);
        }

        let rest = &lines[take..];
        if rest.is_empty() {
            fs::write(&self.path, b"")?;
        } else {
            let mut remainder = rest.join("\n");
            remainder.push('\n');
            fs::write(&self.path, remainder)?;
        }

        Ok(drained)
    }
}
