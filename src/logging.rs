//! Request log: one JSON object per line, plus a bounded in-memory tail.
//!
//! Every entry is also forwarded to `tracing`, so the console output and the
//! JSONL file tell the same story.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

const MAX_RECENT_ENTRIES: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: component.into(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, ctx: serde_json::Value) -> Self {
        self.context = Some(ctx);
        self
    }
}

pub struct Logger {
    recent: VecDeque<LogEntry>,
    writer: Option<BufWriter<File>>,
}

impl Logger {
    /// Append to `file_path`, creating it and its parent directory if needed.
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file_path = file_path.as_ref();

        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        Ok(Self {
            recent: VecDeque::with_capacity(MAX_RECENT_ENTRIES),
            writer: Some(BufWriter::new(file)),
        })
    }

    /// A logger with no backing file.
    pub fn in_memory() -> Self {
        Self {
            recent: VecDeque::with_capacity(MAX_RECENT_ENTRIES),
            writer: None,
        }
    }

    pub fn log(&mut self, entry: LogEntry) {
        if let Some(ref mut writer) = self.writer {
            if let Ok(json) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
        if self.recent.len() >= MAX_RECENT_ENTRIES {
            self.recent.pop_front();
        }
        self.recent.push_back(entry);
    }

    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.recent.iter().rev().take(limit).cloned().collect()
    }
}

#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<Logger>>);

impl SharedLogger {
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Logger::new(file_path)?))))
    }

    pub fn in_memory() -> Self {
        Self(Arc::new(Mutex::new(Logger::in_memory())))
    }

    pub fn log(&self, entry: LogEntry) {
        match entry.level {
            LogLevel::Debug => tracing::debug!(component = %entry.component, "{}", entry.message),
            LogLevel::Info => tracing::info!(component = %entry.component, "{}", entry.message),
            LogLevel::Warn => tracing::warn!(component = %entry.component, "{}", entry.message),
            LogLevel::Error => tracing::error!(component = %entry.component, "{}", entry.message),
        }
        if let Ok(mut logger) = self.0.lock() {
            logger.log(entry);
        }
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, component, message));
    }

    pub fn warn(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, component, message));
    }

    pub fn error(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, component, message));
    }

    pub fn debug(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Debug, component, message));
    }

    pub fn log_with_context(
        &self,
        level: LogLevel,
        component: impl Into<String>,
        message: impl Into<String>,
        context: serde_json::Value,
    ) {
        self.log(LogEntry::new(level, component, message).with_context(context));
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.0.lock().map(|l| l.recent(limit)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_written_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("proxy.jsonl");
        let logger = SharedLogger::new(&path).unwrap();

        logger.info("relay", "Relaying corpCode.xml");
        logger.log_with_context(
            LogLevel::Warn,
            "json_proxy",
            "Upstream answered 404",
            serde_json::json!({ "status": 404 }),
        );

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<LogEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].component, "relay");
        assert_eq!(lines[1].level, LogLevel::Warn);
        assert_eq!(lines[1].context, Some(serde_json::json!({ "status": 404 })));
    }

    #[test]
    fn test_recent_is_newest_first_and_bounded() {
        let logger = SharedLogger::in_memory();
        for i in 0..(MAX_RECENT_ENTRIES + 5) {
            logger.debug("test", format!("entry {i}"));
        }
        let recent = logger.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, format!("entry {}", MAX_RECENT_ENTRIES + 4));
        assert_eq!(logger.recent(usize::MAX).len(), MAX_RECENT_ENTRIES);
    }
}
