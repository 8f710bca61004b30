use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, SubsecRound};
use tracing::{error, info, warn};

/// Timestamp layout of every run log line
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One `[YYYY-MM-DD HH:MM:SS] message` line of a run log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Local wall-clock time, second resolution
    pub timestamp: NaiveDateTime,
    /// Free-text message
    pub message: String,
}

impl LogRecord {
    /// Record stamped with the current local time
    pub fn now(message: impl Into<String>) -> Self {
        Self::at(Local::now().naive_local(), message)
    }

    /// Record stamped with `timestamp`, truncated to whole seconds
    pub fn at(timestamp: NaiveDateTime, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            message: message.into(),
        }
    }

    /// Render as a single log line, without the trailing newline
    pub fn to_line(&self) -> String {
        format!(
            "[{}] {}",
            self.timestamp.format(LOG_TIMESTAMP_FORMAT),
            self.message.replace(['\r', '\n'], " ")
        )
    }

    /// Parse a log line; `None` when the bracketed timestamp is missing or invalid
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim_end_matches(['\r', '\n']).strip_prefix('[')?;
        let (timestamp, message) = rest.split_once(']')?;
        let timestamp = NaiveDateTime::parse_from_str(timestamp, LOG_TIMESTAMP_FORMAT).ok()?;
        let message = message.strip_prefix(' ').unwrap_or(message);

        Some(Self {
            timestamp,
            message: message.to_string(),
        })
    }
}

/// Append-only error and info audit files of the checker
///
/// Every record is mirrored to the process logger. The error file is also the
/// only input of the watchdog.
#[derive(Debug, Clone)]
pub struct RunLog {
    error_path: PathBuf,
    info_path: PathBuf,
}

impl RunLog {
    /// Create a run log writing to the given files
    pub fn new(error_path: impl Into<PathBuf>, info_path: impl Into<PathBuf>) -> Self {
        Self {
            error_path: error_path.into(),
            info_path: info_path.into(),
        }
    }

    /// Append `message` to the error log
    pub fn error(&self, message: &str) {
        error!("{}", message);
        self.append(&self.error_path, &LogRecord::now(message));
    }

    /// Append `message` to the info log
    pub fn info(&self, message: &str) {
        info!("{}", message);
        self.append(&self.info_path, &LogRecord::now(message));
    }

    /// Path of the error log
    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    /// Path of the info log
    pub fn info_path(&self) -> &Path {
        &self.info_path
    }

    /// Full contents of the error log; empty when the file does not exist yet
    ///
    /// Bytes that are not valid UTF-8 become replacement characters, so a
    /// legacy line only fails to parse on its own.
    pub fn read_errors(&self) -> io::Result<String> {
        match fs::read(&self.error_path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    fn append(&self, path: &Path, record: &LogRecord) {
        if let Err(e) = append_line(path, &record.to_line()) {
            warn!("Failed to append to run log {}: {}", path.display(), e);
        }
    }
}

fn append_line(path: &Path, line: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}
