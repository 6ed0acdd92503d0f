//! Timestamp formatting utilities

use chrono::{DateTime, Local, Utc};

/// How an event timestamp is rendered
///
/// # Examples
///
/// ```
/// use applog::core::TimestampFormat;
/// use chrono::Utc;
///
/// let format = TimestampFormat::Iso8601;
/// let timestamp = format.format(&Utc::now());
/// assert!(timestamp.ends_with('Z'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimestampFormat {
    /// ISO 8601 UTC with milliseconds: `2025-01-08T10:30:45.123Z`
    ///
    /// Used for everything written to files.
    #[default]
    Iso8601,

    /// strftime pattern rendered in the local timezone, e.g. `%H:%M:%S`
    ///
    /// Used by the console, where the reader is a human at a terminal.
    Local(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Local(pattern) => {
                let local: DateTime<Local> = datetime.with_timezone(&Local);
                let mut out = String::new();
                // An invalid pattern makes chrono's Display fail; fall back to ISO
                if std::fmt::write(&mut out, format_args!("{}", local.format(pattern))).is_err() {
                    return TimestampFormat::Iso8601.format(datetime);
                }
                out
            }
        }
    }
}
