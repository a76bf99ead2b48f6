//! Append-only, timestamped diagnostic log.
//!
//! Every entry is mirrored to `tracing` under the `diagnostic` target so the
//! same lines show up in the process log and in whatever panel renders the
//! entries.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
}

impl LogLevel {
    fn marker(self) -> &'static str {
        match self {
            LogLevel::Info => "",
            LogLevel::Success => "[ok] ",
            LogLevel::Warn => "[warn] ",
            LogLevel::Error => "[error] ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub seq: u64,
    pub at: DateTime<Local>,
    pub elapsed: Duration,
    pub level: LogLevel,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}{}",
            self.at.format("%H:%M:%S"),
            self.level.marker(),
            self.message
        )
    }
}

/// Cheap-to-clone handle; clones share the same entries.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    started: Instant,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends one line and returns its sequence number.
    pub fn push(&self, level: LogLevel, message: impl Into<String>) -> u64 {
        let message = message.into();
        match level {
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(target: "diagnostic", ?level, "{message}")
            }
            LogLevel::Warn => tracing::warn!(target: "diagnostic", "{message}"),
            LogLevel::Error => tracing::error!(target: "diagnostic", "{message}"),
        }

        let mut entries = self.entries.lock();
        let seq = entries.len() as u64;
        entries.push(LogEntry {
            seq,
            at: Local::now(),
            elapsed: self.started.elapsed(),
            level,
            message,
        });
        seq
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(LogLevel::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(LogLevel::Success, message)
    }

    pub fn warn(&self, message: impl Into<String>) -> u64 {
        self.push(LogLevel::Warn, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(LogLevel::Error, message)
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Rendered lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.to_string()).collect()
    }

    pub fn count_where(&self, pred: impl Fn(&LogEntry) -> bool) -> usize {
        self.entries.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.count_where(|e| e.message.contains(needle)) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::{DiagnosticLog, LogLevel};

    #[test]
    fn entries_are_sequenced_in_order() {
        let log = DiagnosticLog::new();
        assert_eq!(log.info("first"), 0);
        assert_eq!(log.warn("second"), 1);
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].level, LogLevel::Warn);
    }

    #[test]
    fn clones_share_entries() {
        let log = DiagnosticLog::new();
        let other = log.clone();
        other.error("boom");
        assert_eq!(log.len(), 1);
        assert!(log.contains("boom"));
    }

    #[test]
    fn rendered_line_has_time_and_marker() {
        let log = DiagnosticLog::new();
        log.warn("slow parser");
        let line = &log.lines()[0];
        // "HH:MM:SS: [warn] slow parser"
        assert_eq!(line.len(), "00:00:00: [warn] slow parser".len());
        assert!(line.ends_with(": [warn] slow parser"));
    }

    #[test]
    fn count_where_filters_by_level() {
        let log = DiagnosticLog::new();
        log.info("a");
        log.success("b");
        log.warn("c");
        log.warn("d");
        assert_eq!(log.count_where(|e| e.level == LogLevel::Warn), 2);
    }
}
