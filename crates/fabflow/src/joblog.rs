//! In-memory operation log threaded through every pipeline stage.
//!
//! Components take a `&JobLog` and append entries; logging never fails the
//! pipeline. The log is append-only for the duration of a run and is
//! summarized only when a result is handed back to the caller.

use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct LogState {
    entries: Vec<LogEntry>,
    status: String,
}

/// Append-only log for one pipeline run plus a single current status line.
pub struct JobLog {
    state: Mutex<LogState>,
}

impl JobLog {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LogState {
                entries: Vec::new(),
                status: "Idle".to_string(),
            }),
        }
    }

    pub fn append(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
            _ => tracing::debug!("{}", message),
        }
        if let Ok(mut state) = self.state.lock() {
            state.entries.push(LogEntry {
                timestamp: Utc::now().to_rfc3339(),
                level,
                message,
            });
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.append(LogLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.append(LogLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.append(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.append(LogLevel::Error, message);
    }

    pub fn set_status(&self, status: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.status = status.into();
        }
    }

    pub fn status(&self) -> String {
        self.state
            .lock()
            .map(|s| s.status.clone())
            .unwrap_or_default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.state
            .lock()
            .map(|s| s.entries.clone())
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<LogEntry> {
        self.filtered(LogLevel::Error)
    }

    pub fn warnings(&self) -> Vec<LogEntry> {
        self.filtered(LogLevel::Warning)
    }

    fn filtered(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }

    /// Summary returned on a successful run: errors, warnings, and milestone
    /// entries only. Raw entries can run into the thousands for a large
    /// transmittal, so the caller never gets the full list.
    pub fn success_summary(&self) -> LogSummary {
        let entries = self.entries();
        let milestones = entries
            .iter()
            .filter(|e| {
                ["Step", "complete", "Starting", "Finalizing"]
                    .iter()
                    .any(|phrase| e.message.contains(phrase))
            })
            .cloned()
            .collect();

        LogSummary {
            total_entries: entries.len(),
            errors: self.errors(),
            warnings: self.warnings(),
            key_milestones: milestones,
            recent: Vec::new(),
        }
    }

    /// Summary returned on failure: errors, warnings, and the last 10 raw
    /// entries for context.
    pub fn failure_summary(&self) -> LogSummary {
        let entries = self.entries();
        let start = entries.len().saturating_sub(10);
        let recent = entries[start..].to_vec();

        LogSummary {
            total_entries: entries.len(),
            errors: self.errors(),
            warnings: self.warnings(),
            key_milestones: Vec::new(),
            recent,
        }
    }

    /// Full log as JSON, for the `processing_log.json` side artifact.
    pub fn to_json(&self) -> serde_json::Value {
        self.state
            .lock()
            .map(|s| serde_json::to_value(&*s).unwrap_or_default())
            .unwrap_or_default()
    }
}

impl Default for JobLog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogSummary {
    pub total_entries: usize,
    pub errors: Vec<LogEntry>,
    pub warnings: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_milestones: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recent: Vec<LogEntry>,
}
