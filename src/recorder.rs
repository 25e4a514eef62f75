//! Transition log
//!
//! Append-only JSONL file, one line per applied spoof.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::models::LogEntry;

#[derive(Debug, thiserror::Error)]
pub enum LogWriteError {
    #[error("failed to write transition log: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode log entry: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct TransitionLog {
    /// `None` when logging is disabled
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl TransitionLog {
    /// Open the log at `path`, creating its directory.
    ///
    /// An empty path, or a directory that cannot be created, disables logging
    /// for the rest of the run.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.as_os_str().is_empty() {
            tracing::info!("Transition log disabled");
            return Self::disabled();
        }

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                if let Err(e) = fs::create_dir_all(dir) {
                    tracing::error!("Failed to create log directory {}: {}", dir.display(), e);
                    return Self::disabled();
                }
            }
        }

        Self {
            path: Some(path),
            write_lock: Mutex::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one entry; a disabled log accepts and drops it
    pub fn append(&self, entry: &LogEntry) -> Result<(), LogWriteError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn read_entries(path: &Path) -> Vec<LogEntry> {
    fs::read_to_string(path)
        .map(|content| {
            content
                .lines()
                .filter(|l| !l.is_empty())
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        })
        .unwrap_or_default()
}
