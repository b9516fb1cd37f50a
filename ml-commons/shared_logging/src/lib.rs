#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Structured JSON-line logging shared by the engine, the registration workflow and `mlctl`.

use std::{
    fmt,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Telemetry handle combining the logger with an event publisher.
pub mod telemetry;

pub use telemetry::{Telemetry, TelemetryBuilder};

/// Log severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Diagnostics.
    Debug,
    /// Normal progress.
    #[default]
    Info,
    /// Something the operator should look at.
    Warn,
    /// A failed operation.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            other => bail!("unknown log level `{other}`"),
        }
    }
}

/// One JSON log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Emitting component.
    pub module: String,
    /// Severity.
    pub level: LogLevel,
    /// Short dotted message, e.g. `registration.group.created`.
    pub message: String,
    /// Structured fields.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(module: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            module: module.into(),
            level,
            message: message.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Copies the fields of a JSON object into the record; other values are ignored.
    #[must_use]
    pub fn with_metadata(mut self, metadata: &serde_json::Value) -> Self {
        if let Some(fields) = metadata.as_object() {
            self.metadata.extend(fields.clone());
        }
        self
    }
}

/// Append-only JSON-line logger, safe to share across threads.
#[derive(Debug)]
pub struct JsonLogger {
    path: PathBuf,
    min_level: LogLevel,
    writer: Mutex<File>,
}

impl JsonLogger {
    /// Opens (or creates) the log file at `path`, recording every level.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_level(path, LogLevel::Debug)
    }

    /// Opens the log file, dropping records below `min_level`.
    pub fn with_level(path: impl AsRef<Path>, min_level: LogLevel) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            min_level,
            writer: Mutex::new(file),
        })
    }

    /// Whether records at `level` are written.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Writes `record` as one line unless it is below the minimum level.
    pub fn log(&self, record: &LogRecord) -> Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut writer = self.writer.lock();
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }

    /// Log file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn writes_json_lines_with_metadata() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("engine.log")).unwrap();
        let record = LogRecord::new("engine", LogLevel::Info, "engine.train.completed")
            .with_metadata(&json!({ "function_name": "KMEANS" }));
        logger.log(&record).unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.contains("\"message\":\"engine.train.completed\""));
        assert!(content.contains("\"function_name\":\"KMEANS\""));
    }

    #[test]
    fn drops_records_below_min_level() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::with_level(dir.path().join("warn.log"), LogLevel::Warn).unwrap();
        logger
            .log(&LogRecord::new("engine", LogLevel::Debug, "noise"))
            .unwrap();
        logger
            .log(&LogRecord::new("engine", LogLevel::Error, "boom"))
            .unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("boom"));
    }

    #[test]
    fn default_level_is_info() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert!(LogLevel::default() < LogLevel::Warn);
    }

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("Debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("verbose".parse::<LogLevel>().is_err());
    }
}
