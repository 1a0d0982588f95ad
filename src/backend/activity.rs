//! Activity log collected during throughput phases
//!
//! The rendered log is submitted verbatim as the telemetry `log` field.

use chrono::Utc;
use std::sync::Mutex;

/// Append-only, thread-safe list of timestamped activity lines
#[derive(Debug, Default)]
pub struct ActivityLog {
    lines: Mutex<Vec<String>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line, prefixed with a millisecond timestamp
    pub fn record(&self, message: impl AsRef<str>) {
        let line = format!("{} {}", Utc::now().format("%H:%M:%S%.3f"), message.as_ref());
        let mut lines = self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All lines joined by newlines
    pub fn render(&self) -> String {
        let lines = self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.join("\n")
    }
}
