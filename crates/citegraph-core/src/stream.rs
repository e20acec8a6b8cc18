//! Lazy, single-pass reading of newline-delimited paper records.
//!
//! A `RecordStream` yields one item per non-blank line. Lines that fail to
//! decode come out as `RecordError::Malformed` and the stream carries on;
//! a read failure comes out as `RecordError::Io` and ends the stream. The
//! end of the sequence is always `None`, never an error.

use crate::error::{RecordError, Result};
use crate::record::PaperRecord;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// Line counters for a stream, readable at any point during iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Physical lines read so far, blank ones included.
    pub lines_seen: usize,
    /// Lines that could not be decoded.
    pub malformed: usize,
}

/// Iterator over the records of one source.
///
/// Not restartable: reopen the source to read it again.
pub struct RecordStream<R> {
    reader: R,
    buf: Vec<u8>,
    source_name: String,
    stats: StreamStats,
    finished: bool,
}

impl RecordStream<BufReader<File>> {
    /// Opens a file for buffered sequential reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RecordError::io(path, e))?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: BufRead> RecordStream<R> {
    /// Wraps any buffered reader. `source_name` is used in diagnostics.
    pub fn new(reader: R, source_name: impl Into<String>) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            source_name: source_name.into(),
            stats: StreamStats::default(),
            finished: false,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }
}

impl<R: BufRead> Iterator for RecordStream<R> {
    type Item = Result<PaperRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(RecordError::io(&self.source_name, e)));
                }
            }
            self.stats.lines_seen += 1;

            // Undecodable bytes are a bad record, not a failed read.
            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(e) => return Some(Err(self.malformed(e.to_string()))),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return match PaperRecord::from_json(trimmed) {
                Ok(record) => Some(Ok(record)),
                Err(e) => Some(Err(self.malformed(e.to_string()))),
            };
        }
    }
}

impl<R> RecordStream<R> {
    fn malformed(&mut self, reason: String) -> RecordError {
        self.stats.malformed += 1;
        warn!(
            "Skipping malformed record at {}:{}",
            self.source_name, self.stats.lines_seen
        );
        RecordError::Malformed {
            source_name: self.source_name.clone(),
            line: self.stats.lines_seen,
            reason,
        }
    }
}
