//! Append-only operator event log.
//!
//! The log is the observability side channel between the connection state
//! machine and the presentation layer: every state transition appends an
//! entry here, and the whole log plus the most recent entry are mirrored
//! for the monitor view.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Log entry severity
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Single operator-facing log entry
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LogEntry {
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
    pub severity: Severity,
    pub message: String,
}

/// Append-only event log
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and forward it to the diagnostic log
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info | Severity::Success => tracing::info!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }
        self.entries.push(LogEntry {
            timestamp_us: now_us(),
            severity,
            message,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Severity::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
