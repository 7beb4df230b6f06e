//! Event Log
//!
//! Append-only text log of readings, warnings and errors. One record per
//! line: `<code>:<epoch seconds, one decimal>:<payload>`.
//!
//! The field order and separator are read by the charting tools, so they
//! must not change.

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading or writing the event log
#[derive(Error, Debug)]
pub enum LogError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Malformed record: '{0}'")]
    MalformedRecord(String),
}

/// Kind of record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordCode {
    /// A converted fuel reading
    Reading,
    /// Recoverable condition (out of range value, device recovered)
    Warning,
    /// Failure (device lost)
    Error,
}

impl RecordCode {
    /// Single character used in the file
    pub fn as_char(self) -> char {
        match self {
            RecordCode::Reading => 'r',
            RecordCode::Warning => 'w',
            RecordCode::Error => 'e',
        }
    }

    /// Inverse of [`RecordCode::as_char`]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'r' => Some(RecordCode::Reading),
            'w' => Some(RecordCode::Warning),
            'e' => Some(RecordCode::Error),
            _ => None,
        }
    }
}

/// One line of the event log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Record kind
    pub code: RecordCode,
    /// Unix time in seconds
    pub timestamp: f64,
    /// Free-form payload; `<tick>:<raw>:<gallons>` for readings
    pub payload: String,
}

impl LogRecord {
    /// Create a record stamped with the current time
    pub fn now(code: RecordCode, payload: impl Into<String>) -> Self {
        let timestamp = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        Self {
            code,
            timestamp,
            payload: payload.into(),
        }
    }

    /// Format as a log line, including the trailing newline
    pub fn to_line(&self) -> String {
        format!(
            "{}:{:.1}:{}\n",
            self.code.as_char(),
            self.timestamp,
            self.payload
        )
    }

    /// Parse a log line (with or without its newline)
    pub fn parse(line: &str) -> Result<Self, LogError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let malformed = || LogError::MalformedRecord(line.to_string());

        let mut fields = line.splitn(3, ':');
        let code = fields.next().ok_or_else(malformed)?;
        let timestamp = fields.next().ok_or_else(malformed)?;
        let payload = fields.next().ok_or_else(malformed)?;

        let mut chars = code.chars();
        let code = match (chars.next(), chars.next()) {
            (Some(c), None) => RecordCode::from_char(c).ok_or_else(malformed)?,
            _ => return Err(malformed()),
        };
        let timestamp = timestamp.parse::<f64>().map_err(|_| malformed())?;

        Ok(Self {
            code,
            timestamp,
            payload: payload.to_string(),
        })
    }

    /// Gallons carried by a reading record
    pub fn gallons(&self) -> Option<f64> {
        if self.code != RecordCode::Reading {
            return None;
        }
        self.payload.rsplit(':').next()?.parse().ok()
    }
}

/// Appends records to the log file.
///
/// The file is opened, appended to and closed on every call, so each record
/// is on disk before `append` returns and nothing is held open between polls.
#[derive(Debug, Clone)]
pub struct EventLogger {
    path: PathBuf,
}

impl EventLogger {
    /// Logger writing to `path` (created on first append)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stamp and append a record
    pub fn append(
        &self,
        code: RecordCode,
        payload: impl Into<String>,
    ) -> Result<LogRecord, LogError> {
        let record = LogRecord::now(code, payload);
        self.append_record(&record)?;
        Ok(record)
    }

    /// Append an already stamped record
    pub fn append_record(&self, record: &LogRecord) -> Result<(), LogError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(record.to_line().as_bytes()).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: io::Error) -> LogError {
        LogError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// A point of the fuel level history
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelPoint {
    /// Whole unix seconds
    pub timestamp: i64,
    /// Tank content in US gallons
    pub gallons: f64,
}

/// Read the fuel level history recorded at or after `since` (unix seconds).
///
/// Only reading records count; other codes, unparsable lines and records
/// with a zero timestamp are skipped.
pub fn read_levels(path: impl AsRef<Path>, since: i64) -> Result<Vec<LevelPoint>, LogError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LogError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut points = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| LogError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let Ok(record) = LogRecord::parse(&line) else {
            continue;
        };
        let Some(gallons) = record.gallons() else {
            continue;
        };

        let timestamp = record.timestamp.trunc() as i64;
        if timestamp == 0 || timestamp < since {
            continue;
        }
        points.push(LevelPoint { timestamp, gallons });
    }

    Ok(points)
}
