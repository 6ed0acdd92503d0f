//! Core logger types and traits

pub mod config;
pub mod error;
pub mod log_context;
pub mod log_event;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod output_format;
pub mod process;
pub mod request;
pub mod sink;
pub mod timestamp;

pub use config::{ConsoleConfig, Environment, Features, FileConfig, LoggerConfig};
pub use error::{LoggerError, Result};
pub use log_context::{FieldValue, LogContext};
pub use log_event::{ErrorDetail, EventKind, LogEvent, MemoryUsage};
pub use log_level::LogLevel;
pub use logger::{
    HttpRequestSummary, Logger, LoggerBuilder, DEFAULT_PERFORMANCE_THRESHOLD,
    MAX_TRACKED_REQUESTS,
};
pub use metrics::LoggerMetrics;
pub use output_format::OutputFormat;
pub use process::MemorySampler;
pub use request::RequestScope;
pub use sink::Sink;
pub use timestamp::TimestampFormat;
