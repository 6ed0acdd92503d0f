//! Error types for the logging service
//!
//! Nothing in this module ever reaches a logging call site: the [`Logger`]
//! facade reports these on stderr and carries on. They exist so the
//! internals can use `?` and so embedders constructing a [`FileTransport`]
//! directly can see what went wrong.
//!
//! [`Logger`]: crate::Logger
//! [`FileTransport`]: crate::sinks::FileTransport

use std::time::Duration;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Log file could not be opened or written
    #[error("File transport error for '{path}': {message}")]
    FileTransportError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Rotated file could not be compressed
    #[error("Compression failed for '{path}': {message}")]
    CompressionError { path: String, message: String },

    /// The transport lock could not be taken in time
    #[error("Timed out after {0:?} waiting for the file transport")]
    WriteTimeout(Duration),

    /// Write attempted after `close()`
    #[error("File transport already closed")]
    TransportClosed,

    /// A sink panicked while handling an event
    #[error("Sink '{sink}' panicked: {message}")]
    SinkPanic { sink: String, message: String },
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file transport error
    pub fn file_transport(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileTransportError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a compression error
    pub fn compression(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::CompressionError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn sink_panic(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkPanic {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the sink is shut down rather than failing
    pub fn is_closed(&self) -> bool {
        matches!(self, LoggerError::TransportClosed)
    }
}
