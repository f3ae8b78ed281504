//! The run log: an ordered record of every message one pipeline run emits.
//!
//! Every stage receives the log by `&mut` and appends to it. Each entry is
//! echoed to stdout as it is recorded (when echo is enabled), and the whole log
//! is written to disk once at the end of the run by
//! [`OutputWriter::write_log`](crate::output::OutputWriter::write_log).

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Severity tag of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
}

impl Severity {
    /// The bracketed tag printed before the message.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Info => "[INFO]",
            Self::Success => "[SUCCESS]",
            Self::Warn => "[WARN]",
            Self::Error => "[ERROR]",
        }
    }
}

/// One line of the run log.
///
/// Entries without a severity are report bodies (tables, previews,
/// statistics) and are written verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub severity: Option<Severity>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Some(severity) => write!(f, "{} {}", severity.tag(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Append-only log of a single run.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
    echo: bool,
}

impl RunLog {
    /// Create an empty log that echoes each entry to stdout.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            echo: true,
        }
    }

    /// Create an empty log that only records.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.record(Some(Severity::Info), message.into());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.record(Some(Severity::Success), message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.record(Some(Severity::Warn), message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.record(Some(Severity::Error), message.into());
    }

    /// Record untagged report text. Multi-line text becomes one entry per line.
    pub fn plain(&mut self, text: impl AsRef<str>) {
        for line in text.as_ref().lines() {
            self.record(None, line.to_string());
        }
    }

    fn record(&mut self, severity: Option<Severity>, message: String) {
        let entry = LogEntry { severity, message };
        debug!(target: "run_log", "{}", entry);
        if self.echo {
            println!("{}", entry);
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries carrying the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|e| e.severity == Some(severity))
            .count()
    }

    /// Rendered lines in accumulation order.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.to_string()).collect()
    }

    /// The whole log as file contents, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }
}
