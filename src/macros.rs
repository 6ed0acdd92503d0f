//! Logging macros with `format!`-style messages.
//!
//! The level is checked before the message is formatted, so a filtered-out
//! call costs one comparison.
//!
//! # Examples
//!
//! ```
//! use applog::prelude::*;
//! use applog::{fields, info, warn};
//!
//! let logger = Logger::builder()
//!     .console_writer(Box::new(std::io::sink()))
//!     .build();
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // Structured data goes before the message
//! warn!(logger, fields! { "attempt" => 3, "max" => 5 }; "Retrying upstream");
//! ```

/// Build a [`LogContext`](crate::LogContext) from `key => value` pairs.
///
/// ```
/// use applog::fields;
///
/// let data = fields! { "user_id" => 42, "plan" => "pro" };
/// assert_eq!(data.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::LogContext::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::LogContext::new()$(.with_field($key, $value))+
    };
}

/// Log at an explicit level, optionally with structured data.
///
/// ```
/// # use applog::prelude::*;
/// # let logger = Logger::builder().console_writer(Box::new(std::io::sink())).build();
/// use applog::{fields, log};
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(logger, LogLevel::Warn, fields! { "queue" => "mail" }; "Queue backing up");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $data:expr; $($arg:tt)+) => {{
        let level = $level;
        if $logger.is_enabled(level) {
            $logger.log_with_data(level, format!($($arg)+), $data)
        }
    }};
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let level = $level;
        if $logger.is_enabled(level) {
            $logger.log(level, format!($($arg)+))
        }
    }};
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
///
/// ```
/// # use applog::prelude::*;
/// # let logger = Logger::builder().console_writer(Box::new(std::io::sink())).build();
/// use applog::fatal;
/// fatal!(logger, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::config::{Environment, LoggerConfig};
    use crate::core::logger::tests::capture;
    use crate::core::{FieldValue, LogLevel};
    use std::cell::Cell;

    fn logger_at(level: LogLevel) -> (crate::Logger, crate::core::logger::tests::MemorySink) {
        capture(LoggerConfig::defaults_for(Environment::Staging).with_level(level))
    }

    #[test]
    fn test_level_macros_format() {
        let (logger, sink) = logger_at(LogLevel::Trace);
        trace!(logger, "Value: {}", 10);
        debug!(logger, "Count: {}", 5);
        info!(logger, "Items: {}", 100);
        warn!(logger, "Retry {} of {}", 1, 3);
        error!(logger, "Code: {}", 500);
        fatal!(logger, "Critical failure: {}", "system");

        let messages: Vec<String> = sink.take().into_iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec![
                "Value: 10",
                "Count: 5",
                "Items: 100",
                "Retry 1 of 3",
                "Code: 500",
                "Critical failure: system"
            ]
        );
    }

    #[test]
    fn test_filtered_call_skips_formatting() {
        struct Counting<'a>(&'a Cell<u32>);
        impl std::fmt::Display for Counting<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.set(self.0.get() + 1);
                write!(f, "x")
            }
        }

        let (logger, sink) = logger_at(LogLevel::Warn);
        let calls = Cell::new(0);
        debug!(logger, "{}", Counting(&calls));
        assert_eq!(calls.get(), 0);
        warn!(logger, "{}", Counting(&calls));
        assert_eq!(calls.get(), 1);
        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn test_macro_with_fields() {
        let (logger, sink) = logger_at(LogLevel::Info);
        info!(logger, fields! { "user_id" => 7, "plan" => "pro" }; "User {} upgraded", 7);

        let event = sink.take().remove(0);
        assert_eq!(event.message, "User 7 upgraded");
        assert_eq!(event.data.get("user_id"), Some(&FieldValue::Int(7)));
        assert_eq!(event.data.get("plan").and_then(|v| v.as_str()), Some("pro"));
    }

    #[test]
    fn test_empty_fields() {
        assert!(fields! {}.is_empty());
    }
}
