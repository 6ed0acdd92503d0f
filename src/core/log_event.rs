//! The event handed to every sink

use super::log_context::LogContext;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;

/// What produced an event. Serialized as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[default]
    General,
    Http,
    Database,
    Performance,
    Lifecycle,
    Request,
    Response,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::General => "general",
            EventKind::Http => "http",
            EventKind::Database => "database",
            EventKind::Performance => "performance",
            EventKind::Lifecycle => "lifecycle",
            EventKind::Request => "request",
            EventKind::Response => "response",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error attached to an `error`-level event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Capture an error and its `source()` chain. The chain becomes the stack.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            message: err.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }

    pub(crate) fn without_stack(mut self) -> Self {
        self.stack = None;
        self
    }
}

impl From<&str> for ErrorDetail {
    fn from(message: &str) -> Self {
        ErrorDetail::new(message)
    }
}

impl From<String> for ErrorDetail {
    fn from(message: String) -> Self {
        ErrorDetail::new(message)
    }
}

impl From<&std::io::Error> for ErrorDetail {
    fn from(err: &std::io::Error) -> Self {
        ErrorDetail::from_error(err)
    }
}

impl From<&super::error::LoggerError> for ErrorDetail {
    fn from(err: &super::error::LoggerError) -> Self {
        ErrorDetail::from_error(err)
    }
}

impl From<&(dyn StdError + Send + Sync + 'static)> for ErrorDetail {
    fn from(err: &(dyn StdError + Send + Sync + 'static)) -> Self {
        ErrorDetail::from_error(err)
    }
}

/// Resident and virtual memory of this process, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
}

/// One log call, after filtering and enrichment.
///
/// Built once per call and rendered independently by each sink; never
/// persisted as a struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub tag: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    pub pid: u32,
    #[serde(skip_serializing_if = "LogContext::is_empty", default)]
    pub data: LogContext,
    #[serde(skip_serializing_if = "LogContext::is_empty", default)]
    pub context: LogContext,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub memory: Option<MemoryUsage>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            tag: String::new(),
            kind: EventKind::General,
            message: message.into(),
            pid: std::process::id(),
            data: LogContext::new(),
            context: LogContext::new(),
            error: None,
            memory: None,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: LogContext) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: ErrorDetail) -> Self {
        self.error = Some(error);
        self
    }

    #[must_use]
    pub fn with_memory(mut self, memory: MemoryUsage) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Message with line breaks and tabs escaped, for single-line text output.
    ///
    /// Keeps one event on one line so a message cannot forge extra records.
    pub fn sanitized_message(&self) -> String {
        sanitize(&self.message)
    }
}

pub(crate) fn sanitize(text: &str) -> String {
    text.replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
