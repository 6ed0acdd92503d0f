//! Line formats for file output
//!
//! - Text: one human-readable line per event
//! - Json: one JSON object per line (JSONL), for log aggregators

use super::log_event::{sanitize, LogEvent};
use super::timestamp::TimestampFormat;
use serde::Serialize;

/// Output format for file lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Example: `[2025-01-08T10:30:45.123Z] [INFO ] [app] Request processed status=200`
    #[default]
    Text,

    /// Example: `{"timestamp":"2025-01-08T10:30:45.123Z","level":"info","message":"Request processed",...}`
    Json,
}

/// Borrowed view of an event with the timestamp pre-rendered
#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    level: &'static str,
    tag: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    message: &'a str,
    pid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a super::LogContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a super::LogContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a super::ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory: Option<&'a super::MemoryUsage>,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    /// Render an event as a single line, without the trailing newline
    pub fn format(&self, event: &LogEvent) -> super::Result<String> {
        match self {
            OutputFormat::Text => Ok(Self::format_text(event)),
            OutputFormat::Json => Self::format_json(event),
        }
    }

    fn format_text(event: &LogEvent) -> String {
        let mut line = format!(
            "[{}] [{:5}] [{}] {}",
            TimestampFormat::Iso8601.format(&event.timestamp),
            event.level.to_str(),
            event.tag,
            event.sanitized_message()
        );

        if !event.data.is_empty() {
            line.push(' ');
            line.push_str(&sanitize(&event.data.format_fields()));
        }
        if !event.context.is_empty() {
            line.push_str(" | ");
            line.push_str(&sanitize(&event.context.format_fields()));
        }
        if let Some(ref error) = event.error {
            line.push_str(" | error=");
            line.push_str(&sanitize(&error.message));
            if let Some(ref stack) = error.stack {
                line.push_str(" stack=");
                line.push_str(&sanitize(stack));
            }
        }
        if let Some(memory) = event.memory {
            line.push_str(&format!(
                " | rss={} virtual={}",
                memory.rss_bytes, memory.virtual_bytes
            ));
        }

        line
    }

    fn format_json(event: &LogEvent) -> super::Result<String> {
        let line = JsonLine {
            timestamp: TimestampFormat::Iso8601.format(&event.timestamp),
            level: event.level.as_config_str(),
            tag: &event.tag,
            kind: event.kind.as_str(),
            message: &event.message,
            pid: event.pid,
            data: (!event.data.is_empty()).then_some(&event.data),
            context: (!event.context.is_empty()).then_some(&event.context),
            error: event.error.as_ref(),
            memory: event.memory.as_ref(),
        };
        Ok(serde_json::to_string(&line)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorDetail, EventKind, LogContext, LogLevel};

    #[test]
    fn test_text_format() {
        let event = LogEvent::new(LogLevel::Info, "Test message").with_tag("api");
        let result = OutputFormat::Text.format(&event).unwrap();

        assert!(result.contains("[INFO ]"));
        assert!(result.contains("[api] Test message"));
    }

    #[test]
    fn test_text_format_sections() {
        let event = LogEvent::new(LogLevel::Error, "User lookup failed")
            .with_data(LogContext::new().with_field("user_id", 123))
            .with_context(LogContext::new().with_field("request_id", "r-1"))
            .with_error(ErrorDetail::new("not found").with_stack("a\nb"));

        let result = OutputFormat::Text.format(&event).unwrap();
        assert!(result.contains("User lookup failed user_id=123 | request_id=r-1"));
        assert!(result.contains("| error=not found stack=a\\nb"));
        assert!(!result.contains('\n'));
    }

    #[test]
    fn test_json_format() {
        let event = LogEvent::new(LogLevel::Error, "Error \"quoted\"\nsecond line")
            .with_kind(EventKind::Database)
            .with_data(LogContext::new().with_field("latency_ms", 42));
        let result = OutputFormat::Json.format(&event).unwrap();

        assert!(!result.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["level"], "error");
        assert_eq!(parsed["type"], "database");
        assert_eq!(parsed["message"], "Error \"quoted\"\nsecond line");
        assert_eq!(parsed["data"]["latency_ms"], 42);
        assert!(parsed["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(parsed.get("context").is_none());
    }

    #[test]
    fn test_output_format_from_flag() {
        assert_eq!(OutputFormat::from_json_flag(true), OutputFormat::Json);
        assert_eq!(OutputFormat::from_json_flag(false), OutputFormat::Text);
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }
}
