//! Error types for record ingestion.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors surfaced while reading a record source.
#[derive(Error, Debug)]
pub enum RecordError {
    /// A single line could not be decoded. The stream keeps going after this.
    #[error("malformed record at {source_name}:{line}: {reason}")]
    Malformed {
        source_name: String,
        line: usize,
        reason: String,
    },

    /// The underlying reader failed. The stream ends after this.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RecordError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Malformed lines are skipped by consumers; I/O failures are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}
