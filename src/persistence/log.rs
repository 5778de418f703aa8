//! Append-only push event log.
//!
//! One JSON object per line, each a [`LoggedEvent`]: the push payload plus a
//! sequence number and the time it was recorded. Every append is fsynced
//! before the sequence number is handed out, so an [`EventId`] the pipeline
//! reports is durable.
//!
//! A crash mid-write leaves a partial final line. [`EventLog::replay`]
//! detects it and truncates the file back to the last complete record.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::fsync::fsync_file;
use crate::payload::PushEvent;
use crate::types::EventId;

/// Errors that can occur during event log operations.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for event log operations.
pub type Result<T> = std::result::Result<T, EventLogError>;

/// One line of the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub seq: EventId,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub event: PushEvent,
}

/// An append-only event log. Sequence numbers start at 1.
#[derive(Debug)]
pub struct EventLog {
    file: File,
    path: PathBuf,
    next_seq: u64,
}

impl EventLog {
    /// Opens the log at `path`, creating it if needed.
    ///
    /// Existing records are replayed first to find the next sequence number;
    /// a torn final line is truncated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let (events, next_seq) = Self::replay(&path)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(
            path = %path.display(),
            records = events.len(),
            next_seq,
            "event log opened"
        );
        Ok(EventLog {
            file,
            path,
            next_seq,
        })
    }

    /// Appends a push event and fsyncs it.
    pub fn append(&mut self, event: PushEvent) -> Result<LoggedEvent> {
        let logged = LoggedEvent {
            seq: EventId(self.next_seq),
            ts: Utc::now(),
            event,
        };
        let json = serde_json::to_string(&logged)?;
        writeln!(self.file, "{}", json)?;
        fsync_file(&self.file)?;

        self.next_seq += 1;
        Ok(logged)
    }

    /// Returns the sequence number the next append will get.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every complete record, truncating a partial final line.
    ///
    /// Returns `(events, next_seq)`. A missing file is an empty log.
    pub fn replay(path: impl AsRef<Path>) -> Result<(Vec<LoggedEvent>, u64)> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 1)),
            Err(e) => return Err(e.into()),
        };
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut events: Vec<LoggedEvent> = Vec::new();
        let mut valid_len = 0u64;
        let mut pos = 0u64;
        loop {
            let mut line = String::new();
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                break;
            }
            let line_start = pos;
            pos += bytes_read as u64;

            if line.trim().is_empty() {
                valid_len = pos;
                continue;
            }
            match serde_json::from_str::<LoggedEvent>(line.trim()) {
                Ok(event)
                    if events.last().is_none_or(|prev| event.seq > prev.seq)
                        && line.ends_with('\n') =>
                {
                    events.push(event);
                    valid_len = pos;
                }
                _ => {
                    warn!(
                        path = %path.display(),
                        offset = line_start,
                        "truncating damaged event log tail"
                    );
                    valid_len = line_start;
                    break;
                }
            }
        }

        if valid_len < file_len {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            fsync_file(&file)?;
        }

        let next_seq = events.last().map_or(1, |e| e.seq.0 + 1);
        Ok((events, next_seq))
    }
}
