//! Process-wide logger
//!
//! One [`Logger`] per process, constructed at most once. The first call to
//! [`initialize`] or [`logger`] decides its configuration; afterwards every
//! caller gets the same instance. [`shutdown`] closes its sinks but leaves
//! it installed, so late log calls still reach the console and a second
//! initialization cannot open a competing file transport.

use crate::core::{Logger, LoggerConfig};
use std::sync::{Arc, OnceLock};

static GLOBAL_LOGGER: OnceLock<Arc<Logger>> = OnceLock::new();

/// Install the global logger built from `config`.
///
/// Only the first call builds anything. Later calls, including ones made
/// after [`shutdown`], return the existing instance and ignore `config`.
pub fn initialize(config: LoggerConfig) -> Arc<Logger> {
    let mut config = Some(config);
    let logger = GLOBAL_LOGGER.get_or_init(|| {
        Arc::new(Logger::new(config.take().unwrap_or_default()))
    });
    if config.is_some() {
        eprintln!("[LOGGER WARNING] Global logger already initialized; new configuration ignored");
    }
    Arc::clone(logger)
}

/// The global logger, built from the environment on first use
///
/// # Example
///
/// ```no_run
/// let log = applog::global::logger();
/// log.info("Server listening");
/// ```
pub fn logger() -> Arc<Logger> {
    Arc::clone(GLOBAL_LOGGER.get_or_init(|| Arc::new(Logger::from_env())))
}

/// Log `message` and close the global logger's sinks. No-op if the logger
/// was never initialized or is already shut down.
pub fn shutdown(message: &str) {
    if let Some(logger) = GLOBAL_LOGGER.get() {
        logger.shutdown(message);
    }
}

pub fn is_initialized() -> bool {
    GLOBAL_LOGGER.get().is_some()
}
