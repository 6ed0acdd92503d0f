//! # applog
//!
//! Structured application logging: leveled events enriched with context,
//! fanned out to the console and to size-rotated log files, configured from
//! the environment.
//!
//! ## Features
//!
//! - **Environment-driven configuration**: `APP_ENV` tiers plus `LOG_*` overrides
//! - **Dual output**: human-friendly console, JSON or text lines on disk
//! - **Rotation and retention**: size-based rotation, count-based pruning, gzip
//! - **Request tracking**: correlation ids with duration summaries
//! - **Thread safe**: share one logger, or hand out children with extra context
//!
//! ```
//! use applog::prelude::*;
//!
//! let logger = Logger::builder()
//!     .console_writer(Box::new(std::io::sink()))
//!     .build();
//!
//! logger.startup("Booting");
//! let api = logger.child(LogContext::new().with_field("component", "api"));
//! api.info("Listening");
//! logger.shutdown("Bye");
//! ```

pub mod core;
pub mod global;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        Environment, ErrorDetail, EventKind, FieldValue, HttpRequestSummary, LogContext,
        LogEvent, LogLevel, Logger, LoggerBuilder, LoggerConfig, LoggerError, LoggerMetrics,
        OutputFormat, RequestScope, Result, Sink,
    };
    pub use crate::sinks::{ConsoleSink, FileSink, FileTransport, RotationPolicy};
}

pub use crate::core::{
    ConsoleConfig, Environment, ErrorDetail, EventKind, Features, FieldValue, FileConfig,
    HttpRequestSummary, LogContext, LogEvent, LogLevel, Logger, LoggerBuilder, LoggerConfig,
    LoggerError, LoggerMetrics, MemoryUsage, OutputFormat, RequestScope, Result, Sink,
    TimestampFormat, DEFAULT_PERFORMANCE_THRESHOLD, MAX_TRACKED_REQUESTS,
};
pub use sinks::{ConsoleSink, FileSink, FileTransport, RotationPolicy};
