use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

/// User-facing record of one extended PDF build. Every entry is also
/// emitted through `tracing`.
#[derive(Clone, Debug, Default)]
pub struct ExtendedPdfLogger {
    entries: Vec<LogEntry>,
}

impl ExtendedPdfLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, component: &str, message: impl Into<String>) {
        let message = message.into();
        info!(event_name = "pdf.extended.info", component, %message);
        self.push(LogLevel::Info, component, message);
    }

    pub fn warning(&mut self, component: &str, message: impl Into<String>) {
        let message = message.into();
        warn!(event_name = "pdf.extended.warning", component, %message);
        self.push(LogLevel::Warning, component, message);
    }

    pub fn error(&mut self, component: &str, message: impl Into<String>) {
        let message = message.into();
        error!(event_name = "pdf.extended.error", component, %message);
        self.push(LogLevel::Error, component, message);
    }

    fn push(&mut self, level: LogLevel, component: &str, message: String) {
        self.entries.push(LogEntry {
            level,
            component: component.to_string(),
            message,
            recorded_at: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    fn count(&self, level: LogLevel) -> usize {
        self.entries.iter().filter(|entry| entry.level == level).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(LogLevel::Error) > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.count(LogLevel::Warning) > 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Short German summary for the person who requested the offer.
    pub fn get_user_friendly_summary(&self) -> String {
        let errors = self.count(LogLevel::Error);
        let warnings = self.count(LogLevel::Warning);
        if errors == 0 && warnings == 0 {
            return "Erweiterte PDF-Seiten wurden ohne Probleme erstellt.".to_string();
        }

        let mut summary = String::new();
        if errors > 0 {
            summary.push_str(&format!("{errors} Fehler bei der PDF-Erstellung:\n"));
            for entry in self.entries.iter().filter(|entry| entry.level == LogLevel::Error) {
                summary.push_str(&format!("- [{}] {}\n", entry.component, entry.message));
            }
        }
        if warnings > 0 {
            summary.push_str(&format!("{warnings} Warnungen:\n"));
            for entry in self.entries.iter().filter(|entry| entry.level == LogLevel::Warning) {
                summary.push_str(&format!("- [{}] {}\n", entry.component, entry.message));
            }
        }
        summary.trim_end().to_string()
    }
}
