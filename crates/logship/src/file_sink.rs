//! Size-rotated append-only file sink.
//!
//! Rendered lines are appended to a live file; when an append would push the
//! file past `max_size_bytes`, backups shift down (`base.1` becomes
//! `base.2`, and so on up to `max_files`), the live file is renamed to
//! `base.1`, and a fresh file is opened. A `max_size_bytes` of zero disables
//! rotation.
//!
//! Write and rotation errors are logged through `tracing` and swallowed:
//! logging must never crash the host application, so the sink degrades to
//! dropping lines when the disk misbehaves.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::config::FileConfig;

struct SinkState {
    file: File,
    size: u64,
}

/// Shared append-only writer with size-based rotation.
pub struct FileSink {
    inner: Mutex<SinkState>,
    path: PathBuf,
    max_size: u64,
    max_files: usize,
}

impl FileSink {
    /// Opens (or creates) the live file in append mode, creating parent
    /// directories on demand.
    pub fn new(config: &FileConfig) -> io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = open_append(&config.path)?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(FileSink {
            inner: Mutex::new(SinkState { file, size }),
            path: config.path.clone(),
            max_size: config.max_size_bytes,
            max_files: config.max_files,
        })
    }

    /// Appends one rendered line, rotating first if the line would push the
    /// live file past the size threshold.
    pub fn write_line(&self, line: &str) {
        let mut state = match self.inner.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        let bytes = line.len() as u64 + 1;
        if self.max_size > 0 && state.size > 0 && state.size + bytes > self.max_size {
            if let Err(err) = self.rotate(&mut state) {
                warn!(error = %err, path = %self.path.display(), "log file rotation failed");
            }
        }

        match writeln!(state.file, "{line}") {
            Ok(()) => state.size += bytes,
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "log file write failed; line dropped");
            }
        }
    }

    fn rotate(&self, state: &mut SinkState) -> io::Result<()> {
        state.file.flush()?;

        let backups = self.max_files.max(1);
        let oldest = self.backup_path(backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for idx in (1..backups).rev() {
            let from = self.backup_path(idx);
            if from.exists() {
                fs::rename(&from, self.backup_path(idx + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        state.file = open_append(&self.path)?;
        state.size = 0;
        Ok(())
    }

    fn backup_path(&self, idx: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{idx}"));
        PathBuf::from(name)
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
