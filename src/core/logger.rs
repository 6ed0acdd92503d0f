//! Logger service: filtering, enrichment, dispatch and request tracking
//!
//! A [`Logger`] owns an ordered list of sinks fixed at construction. Child
//! loggers share those sinks along with the configuration, the request
//! table and the metrics; only the ambient context is per instance.

use super::config::LoggerConfig;
use super::error::LoggerError;
use super::log_context::LogContext;
use super::log_event::{ErrorDetail, EventKind, LogEvent};
use super::log_level::LogLevel;
use super::metrics::LoggerMetrics;
use super::process::MemorySampler;
use super::sink::Sink;
use crate::sinks::{ConsoleSink, FileSink};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Threshold used by [`Logger::performance`]
pub const DEFAULT_PERFORMANCE_THRESHOLD: Duration = Duration::from_millis(100);

/// Requests tracked at once before the oldest is evicted
pub const MAX_TRACKED_REQUESTS: usize = 10_000;

/// Report the first sink failure and then every this many
const FAILURE_REPORT_INTERVAL: u64 = 1000;

/// Access-log record for [`Logger::http`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequestSummary {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration: Duration,
    pub user_agent: Option<String>,
    pub client_addr: Option<String>,
}

impl HttpRequestSummary {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        duration: Duration,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            status,
            duration,
            user_agent: None,
            client_addr: None,
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_client_addr(mut self, client_addr: impl Into<String>) -> Self {
        self.client_addr = Some(client_addr.into());
        self
    }
}

/// State shared by a logger and all of its children
struct Shared {
    config: LoggerConfig,
    sinks: Vec<Box<dyn Sink>>,
    requests: Mutex<HashMap<String, Instant>>,
    max_tracked_requests: usize,
    metrics: LoggerMetrics,
    memory: Option<MemorySampler>,
    shut_down: AtomicBool,
}

/// # Example
///
/// ```
/// use applog::prelude::*;
///
/// let logger = Logger::builder()
///     .config(LoggerConfig::default().with_tag("billing"))
///     .console_writer(Box::new(std::io::sink()))
///     .build();
///
/// logger.info("Invoice created");
/// logger.warn_with_data("Slow upstream", LogContext::new().with_field("ms", 812));
/// ```
pub struct Logger {
    shared: Arc<Shared>,
    context: RwLock<LogContext>,
}

fn ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

impl Logger {
    /// Build a logger with a console sink and, if enabled, a file sink.
    ///
    /// A file sink that cannot be opened is reported on stderr and left
    /// out; the logger keeps working console-only.
    pub fn new(config: LoggerConfig) -> Self {
        LoggerBuilder::new().config(config).build()
    }

    /// Build from the process environment
    pub fn from_env() -> Self {
        Self::new(LoggerConfig::from_env())
    }

    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.shared.config
    }

    pub fn level(&self) -> LogLevel {
        self.shared.config.level
    }

    /// Whether an event at `level` would be emitted
    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.passes(self.shared.config.level)
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.shared.metrics
    }

    /// Names of the composed sinks, in dispatch order
    pub fn sink_names(&self) -> Vec<&str> {
        self.shared.sinks.iter().map(|s| s.name()).collect()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shut_down.load(Ordering::Acquire)
    }

    // ---- core emission ----

    fn emit(
        &self,
        level: LogLevel,
        kind: EventKind,
        message: impl Into<String>,
        data: LogContext,
        error: Option<ErrorDetail>,
    ) {
        if !self.is_enabled(level) {
            return;
        }

        let mut event = LogEvent::new(level, message)
            .with_kind(kind)
            .with_tag(self.shared.config.tag.as_str())
            .with_data(data)
            .with_context(self.context.read().clone());
        if let Some(error) = error {
            event = event.with_error(error);
        }
        if let Some(memory) = self.shared.memory.as_ref().and_then(|m| m.sample()) {
            event = event.with_memory(memory);
        }

        self.dispatch(&event);
    }

    /// Hand `event` to every sink, isolating failures and panics per sink
    fn dispatch(&self, event: &LogEvent) {
        let mut failures: Vec<String> = Vec::new();

        for sink in &self.shared.sinks {
            match catch_unwind(AssertUnwindSafe(|| sink.emit(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures.push(format!("[LOGGER ERROR] Sink '{}' failed: {}", sink.name(), e))
                }
                Err(panic) => failures.push(format!(
                    "[LOGGER CRITICAL] {}. Other sinks continue to function.",
                    LoggerError::sink_panic(sink.name(), panic_message(&*panic))
                )),
            }
        }

        if failures.is_empty() {
            self.shared.metrics.record_logged();
            return;
        }

        let previous = self.shared.metrics.record_dropped();
        if previous == 0 || (previous + 1) % FAILURE_REPORT_INTERVAL == 0 {
            for failure in &failures {
                eprintln!("{} (dropped so far: {})", failure, previous + 1);
            }
        }
    }

    fn for_each_sink<F>(&self, operation: &str, f: F)
    where
        F: Fn(&dyn Sink) -> super::Result<()>,
    {
        for sink in &self.shared.sinks {
            match catch_unwind(AssertUnwindSafe(|| f(sink.as_ref()))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!("[LOGGER ERROR] Sink '{}' {} failed: {}", sink.name(), operation, e)
                }
                Err(panic) => eprintln!(
                    "[LOGGER CRITICAL] Sink '{}' panicked during {}: {}",
                    sink.name(),
                    operation,
                    panic_message(&*panic)
                ),
            }
        }
    }

    // ---- leveled methods ----

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(level, EventKind::General, message, LogContext::new(), None);
    }

    pub fn log_with_data(&self, level: LogLevel, message: impl Into<String>, data: LogContext) {
        self.emit(level, EventKind::General, message, data, None);
    }

    pub fn fatal(&self, message: impl Into<String>) {
        self.log(LogLevel::Fatal, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    pub fn fatal_with_data(&self, message: impl Into<String>, data: LogContext) {
        self.log_with_data(LogLevel::Fatal, message, data);
    }

    pub fn error_with_data(&self, message: impl Into<String>, data: LogContext) {
        self.log_with_data(LogLevel::Error, message, data);
    }

    pub fn warn_with_data(&self, message: impl Into<String>, data: LogContext) {
        self.log_with_data(LogLevel::Warn, message, data);
    }

    pub fn info_with_data(&self, message: impl Into<String>, data: LogContext) {
        self.log_with_data(LogLevel::Info, message, data);
    }

    pub fn debug_with_data(&self, message: impl Into<String>, data: LogContext) {
        self.log_with_data(LogLevel::Debug, message, data);
    }

    pub fn trace_with_data(&self, message: impl Into<String>, data: LogContext) {
        self.log_with_data(LogLevel::Trace, message, data);
    }

    /// Error event carrying an [`ErrorDetail`].
    ///
    /// The stack is dropped unless `features.error_stack_traces` is on.
    ///
    /// ```
    /// use applog::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .console_writer(Box::new(std::io::sink()))
    ///     .build();
    /// let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml");
    /// logger.error_with("Cannot load settings", &err, LogContext::new());
    /// ```
    pub fn error_with(
        &self,
        message: impl Into<String>,
        error: impl Into<ErrorDetail>,
        data: LogContext,
    ) {
        if !self.is_enabled(LogLevel::Error) {
            return;
        }
        let mut detail = error.into();
        if !self.shared.config.features.error_stack_traces {
            detail = detail.without_stack();
        }
        self.emit(LogLevel::Error, EventKind::General, message, data, Some(detail));
    }

    // ---- context ----

    /// Shallow-merge `patch` into this logger's ambient context
    pub fn set_context(&self, patch: LogContext) {
        self.context.write().merge(&patch);
    }

    pub fn clear_context(&self) {
        self.context.write().clear();
    }

    /// Snapshot of the ambient context
    pub fn context(&self) -> LogContext {
        self.context.read().clone()
    }

    /// Logger sharing this one's sinks, with its context plus `patch`.
    ///
    /// Later context changes on either side do not affect the other.
    pub fn child(&self, patch: LogContext) -> Logger {
        Logger {
            shared: Arc::clone(&self.shared),
            context: RwLock::new(self.context.read().merged(&patch)),
        }
    }

    // ---- specialized helpers ----

    /// Access-log line; skipped when `features.request_logging` is off
    pub fn http(&self, summary: &HttpRequestSummary) {
        if !self.shared.config.features.request_logging || !self.is_enabled(LogLevel::Info) {
            return;
        }
        let duration_ms = ms(summary.duration);
        let mut data = LogContext::new()
            .with_field("method", summary.method.as_str())
            .with_field("path", summary.path.as_str())
            .with_field("status", summary.status)
            .with_field("duration_ms", duration_ms);
        if let Some(ref user_agent) = summary.user_agent {
            data.add_field("user_agent", user_agent);
        }
        if let Some(ref client_addr) = summary.client_addr {
            data.add_field("client_addr", client_addr);
        }

        self.emit(
            LogLevel::Info,
            EventKind::Http,
            format!(
                "{} {} - {} ({}ms)",
                summary.method, summary.path, summary.status, duration_ms
            ),
            data,
            None,
        );
    }

    /// Query timing. The query text is left out in production.
    pub fn database(&self, query: &str, duration: Duration, success: bool) {
        if !self.is_enabled(LogLevel::Info) {
            return;
        }
        let duration_ms = ms(duration);
        let mut data = LogContext::new()
            .with_field("duration_ms", duration_ms)
            .with_field("success", success);
        if !self.shared.config.environment.is_production() {
            data.add_field("query", query);
        }

        let outcome = if success { "ok" } else { "failed" };
        self.emit(
            LogLevel::Info,
            EventKind::Database,
            format!("DB {} {}ms", outcome, duration_ms),
            data,
            None,
        );
    }

    /// [`performance_with_threshold`](Self::performance_with_threshold) at
    /// [`DEFAULT_PERFORMANCE_THRESHOLD`]
    pub fn performance(&self, operation: &str, duration: Duration) {
        self.performance_with_threshold(operation, duration, DEFAULT_PERFORMANCE_THRESHOLD);
    }

    /// Warn when `duration` exceeds `threshold`, debug otherwise.
    /// Skipped when `features.performance_metrics` is off.
    pub fn performance_with_threshold(
        &self,
        operation: &str,
        duration: Duration,
        threshold: Duration,
    ) {
        if !self.shared.config.features.performance_metrics {
            return;
        }
        let level = if duration > threshold {
            LogLevel::Warn
        } else {
            LogLevel::Debug
        };
        if !self.is_enabled(level) {
            return;
        }
        let duration_ms = ms(duration);
        let data = LogContext::new()
            .with_field("operation", operation)
            .with_field("duration_ms", duration_ms)
            .with_field("threshold_ms", ms(threshold));

        self.emit(
            level,
            EventKind::Performance,
            format!("{} took {}ms", operation, duration_ms),
            data,
            None,
        );
    }

    // ---- lifecycle ----

    fn lifecycle(&self, phase: &str, message: impl Into<String>) {
        self.emit(
            LogLevel::Info,
            EventKind::Lifecycle,
            message,
            LogContext::new().with_field("phase", phase),
            None,
        );
    }

    pub fn startup(&self, message: impl Into<String>) {
        self.lifecycle("startup", message);
    }

    pub fn ready(&self, message: impl Into<String>) {
        self.lifecycle("ready", message);
    }

    /// Log `message`, then flush and close every sink.
    ///
    /// Only the first call on a logger family does anything; children share
    /// the flag. Events logged afterwards still reach the console.
    pub fn shutdown(&self, message: impl Into<String>) {
        if self.shared.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.lifecycle("shutdown", message);

        let pending = self.pending_requests();
        if pending > 0 {
            eprintln!(
                "[LOGGER WARNING] Shutting down with {} request(s) still tracked",
                pending
            );
        }
        self.for_each_sink("close", |sink| sink.close());
    }

    pub fn flush(&self) {
        self.for_each_sink("flush", |sink| sink.flush());
    }

    // ---- request tracking ----

    /// Start the clock for `request_id`; restarts it if already tracked
    pub fn start_request(&self, request_id: &str) {
        let evicted = {
            let mut requests = self.shared.requests.lock();
            let mut evicted = None;
            if !requests.contains_key(request_id)
                && requests.len() >= self.shared.max_tracked_requests
            {
                let oldest = requests
                    .iter()
                    .min_by_key(|(_, started)| **started)
                    .map(|(id, _)| id.clone());
                if let Some(oldest) = oldest {
                    requests.remove(&oldest);
                    evicted = Some(oldest);
                }
            }
            requests.insert(request_id.to_string(), Instant::now());
            evicted
        };

        if let Some(oldest) = evicted {
            self.shared.metrics.record_evicted_request();
            self.emit(
                LogLevel::Warn,
                EventKind::Request,
                "Request tracking table full; evicted oldest request",
                LogContext::new()
                    .with_field("request_id", oldest)
                    .with_field("limit", self.shared.max_tracked_requests),
                None,
            );
        }
    }

    pub fn request(&self, message: impl Into<String>, request_id: &str) {
        self.emit(
            LogLevel::Info,
            EventKind::Request,
            message,
            LogContext::new().with_field("request_id", request_id),
            None,
        );
    }

    pub fn response(&self, message: impl Into<String>, request_id: &str) {
        self.emit(
            LogLevel::Info,
            EventKind::Response,
            message,
            LogContext::new().with_field("request_id", request_id),
            None,
        );
    }

    /// Emit the completion summary and stop tracking `request_id`.
    ///
    /// An id that is not tracked still gets a summary, with `tracked: false`
    /// and no duration.
    pub fn end_request(&self, request_id: &str, status: u16) {
        let started = self.shared.requests.lock().remove(request_id);

        let level = match status {
            500..=u16::MAX => LogLevel::Error,
            400..=499 => LogLevel::Warn,
            _ => LogLevel::Info,
        };
        if !self.is_enabled(level) {
            return;
        }
        let mut data = LogContext::new()
            .with_field("request_id", request_id)
            .with_field("status", status);
        match started {
            Some(started) => data.add_field("duration_ms", ms(started.elapsed())),
            None => data.add_field("tracked", false),
        }

        self.emit(level, EventKind::Request, "Request completed", data, None);
    }

    /// Requests started and not yet ended
    pub fn pending_requests(&self) -> usize {
        self.shared.requests.lock().len()
    }

    pub fn is_tracking(&self, request_id: &str) -> bool {
        self.shared.requests.lock().contains_key(request_id)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LoggerConfig::default())
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.shared.config.level)
            .field("tag", &self.shared.config.tag)
            .field("sinks", &self.sink_names())
            .field("context", &*self.context.read())
            .finish()
    }
}

/// Builder for [`Logger`]
///
/// Sinks are fixed once built. The console sink always comes first, then
/// the file sink when the config enables it, then any extra sinks in the
/// order they were added.
pub struct LoggerBuilder {
    config: LoggerConfig,
    console_writer: Option<Box<dyn Write + Send>>,
    extra_sinks: Vec<Box<dyn Sink>>,
    max_tracked_requests: usize,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
            console_writer: None,
            extra_sinks: Vec::new(),
            max_tracked_requests: MAX_TRACKED_REQUESTS,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.config.tag = tag.into();
        self
    }

    /// Send console output to `writer` instead of stdout/stderr
    #[must_use = "builder methods return a new value"]
    pub fn console_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.console_writer = Some(writer);
        self
    }

    /// Add a sink after the built-in ones
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.extra_sinks.push(Box::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_tracked_requests(mut self, limit: usize) -> Self {
        self.max_tracked_requests = limit.max(1);
        self
    }

    pub fn build(self) -> Logger {
        let config = self.config;
        let mut sinks: Vec<Box<dyn Sink>> = Vec::with_capacity(2 + self.extra_sinks.len());

        let console = match self.console_writer {
            Some(writer) => ConsoleSink::with_writer(config.console.clone(), writer),
            None => ConsoleSink::new(config.console.clone()),
        };
        sinks.push(Box::new(console));

        if config.file.enabled {
            match FileSink::from_config(&config.file) {
                Ok(file) => sinks.push(Box::new(file)),
                Err(e) => eprintln!(
                    "[LOGGER ERROR] File logging disabled, continuing console-only: {}",
                    e
                ),
            }
        }
        sinks.extend(self.extra_sinks);

        let memory = config.features.memory_usage.then(MemorySampler::new);

        Logger {
            shared: Arc::new(Shared {
                config,
                sinks,
                requests: Mutex::new(HashMap::new()),
                max_tracked_requests: self.max_tracked_requests,
                metrics: LoggerMetrics::new(),
                memory,
                shut_down: AtomicBool::new(false),
            }),
            context: RwLock::new(LogContext::new()),
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::config::Environment;
    use crate::core::{FieldValue, Result};
    use std::thread;

    /// Collects events in memory
    #[derive(Clone, Default)]
    pub(crate) struct MemorySink {
        pub events: Arc<Mutex<Vec<LogEvent>>>,
        pub closed: Arc<AtomicBool>,
    }

    impl Sink for MemorySink {
        fn emit(&self, event: &LogEvent) -> Result<()> {
            self.events.lock().push(event.clone());
            Ok(())
        }
        fn flush(&self) -> Result<()> {
            Ok(())
        }
        fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &str {
            "memory"
        }
    }

    impl MemorySink {
        pub fn take(&self) -> Vec<LogEvent> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    struct FailingSink;

    impl Sink for FailingSink {
        fn emit(&self, _event: &LogEvent) -> Result<()> {
            Err(LoggerError::TransportClosed)
        }
        fn flush(&self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    struct PanickingSink;

    impl Sink for PanickingSink {
        fn emit(&self, _event: &LogEvent) -> Result<()> {
            panic!("sink exploded");
        }
        fn flush(&self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn staging(level: LogLevel) -> LoggerConfig {
        let mut config = LoggerConfig::defaults_for(Environment::Staging).with_tag("test");
        config.level = level;
        config.features.memory_usage = false;
        config
    }

    pub(crate) fn capture(config: LoggerConfig) -> (Logger, MemorySink) {
        let sink = MemorySink::default();
        let logger = Logger::builder()
            .config(config)
            .console_writer(Box::new(std::io::sink()))
            .sink(sink.clone())
            .build();
        (logger, sink)
    }

    #[test]
    fn test_level_filtering() {
        let (logger, sink) = capture(staging(LogLevel::Warn));

        logger.trace("t");
        logger.debug("d");
        logger.info("i");
        logger.warn("w");
        logger.error("e");
        logger.fatal("f");

        let levels: Vec<LogLevel> = sink.take().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Warn, LogLevel::Error, LogLevel::Fatal]);
    }

    #[test]
    fn test_silent_emits_nothing() {
        let (logger, sink) = capture(staging(LogLevel::Silent));
        logger.fatal("nothing");
        logger.log(LogLevel::Silent, "nothing either");
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_event_enrichment() {
        let (logger, sink) = capture(staging(LogLevel::Info));
        logger.set_context(LogContext::new().with_field("service", "billing"));

        logger.info_with_data("Charged", LogContext::new().with_field("amount", 42));

        let events = sink.take();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.tag, "test");
        assert_eq!(event.pid, std::process::id());
        assert_eq!(event.kind, EventKind::General);
        assert_eq!(event.data.get("amount"), Some(&FieldValue::Int(42)));
        assert_eq!(event.context.get("service").and_then(|v| v.as_str()), Some("billing"));
        assert!(event.memory.is_none());
    }

    #[test]
    fn test_context_merge_and_clear() {
        let (logger, _sink) = capture(staging(LogLevel::Info));

        logger.set_context(LogContext::new().with_field("a", 1).with_field("b", 2));
        logger.set_context(LogContext::new().with_field("b", 3));
        assert_eq!(logger.context().get("a"), Some(&FieldValue::Int(1)));
        assert_eq!(logger.context().get("b"), Some(&FieldValue::Int(3)));

        logger.clear_context();
        assert!(logger.context().is_empty());
    }

    #[test]
    fn test_child_context_isolation() {
        let (parent, sink) = capture(staging(LogLevel::Info));
        parent.set_context(LogContext::new().with_field("a", 1));

        let child = parent.child(LogContext::new().with_field("b", 2));
        child.set_context(LogContext::new().with_field("c", 3));
        parent.set_context(LogContext::new().with_field("d", 4));

        let child_ctx = child.context();
        assert_eq!(child_ctx.len(), 3);
        assert!(child_ctx.get("d").is_none());
        let parent_ctx = parent.context();
        assert!(parent_ctx.get("b").is_none());
        assert!(parent_ctx.get("c").is_none());

        // Same sinks underneath
        child.info("from child");
        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn test_error_with_stack_toggle() {
        let mut config = staging(LogLevel::Info);
        let (logger, sink) = capture(config.clone());
        logger.error_with(
            "Lookup failed",
            ErrorDetail::new("not found").with_stack("at a"),
            LogContext::new(),
        );
        let error = sink.take().remove(0).error.unwrap();
        assert_eq!(error.stack.as_deref(), Some("at a"));

        config.features.error_stack_traces = false;
        let (logger, sink) = capture(config);
        logger.error_with(
            "Lookup failed",
            ErrorDetail::new("not found").with_stack("at a"),
            LogContext::new(),
        );
        let error = sink.take().remove(0).error.unwrap();
        assert_eq!(error.message, "not found");
        assert!(error.stack.is_none());
    }

    #[test]
    fn test_http_gating_and_fields() {
        let mut config = staging(LogLevel::Info);
        let (logger, sink) = capture(config.clone());
        let summary = HttpRequestSummary::new("GET", "/users", 200, Duration::from_millis(15))
            .with_user_agent("curl/8")
            .with_client_addr("10.0.0.1");

        logger.http(&summary);
        let event = sink.take().remove(0);
        assert_eq!(event.kind, EventKind::Http);
        assert_eq!(event.level, LogLevel::Info);
        assert_eq!(event.message, "GET /users - 200 (15ms)");
        assert_eq!(event.data.get("status"), Some(&FieldValue::Int(200)));
        assert_eq!(event.data.get("user_agent").and_then(|v| v.as_str()), Some("curl/8"));

        config.features.request_logging = false;
        let (logger, sink) = capture(config);
        logger.http(&summary);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_database_query_redacted_in_production() {
        let (logger, sink) = capture(staging(LogLevel::Info));
        logger.database("SELECT 1", Duration::from_millis(3), true);
        let event = sink.take().remove(0);
        assert_eq!(event.message, "DB ok 3ms");
        assert_eq!(event.data.get("query").and_then(|v| v.as_str()), Some("SELECT 1"));

        let mut config = LoggerConfig::defaults_for(Environment::Production);
        config.file.enabled = false;
        let (logger, sink) = capture(config);
        logger.database("SELECT secret", Duration::from_millis(9), false);
        let event = sink.take().remove(0);
        assert_eq!(event.message, "DB failed 9ms");
        assert!(event.data.get("query").is_none());
        assert_eq!(event.data.get("success"), Some(&FieldValue::Bool(false)));
    }

    #[test]
    fn test_performance_threshold() {
        let mut config = staging(LogLevel::Debug);
        config.features.performance_metrics = true;
        let (logger, sink) = capture(config.clone());

        logger.performance("render", Duration::from_millis(250));
        logger.performance("render", Duration::from_millis(100));
        logger.performance_with_threshold("query", Duration::from_millis(20), Duration::from_millis(10));

        let events = sink.take();
        assert_eq!(events[0].level, LogLevel::Warn);
        assert_eq!(events[0].message, "render took 250ms");
        assert_eq!(events[1].level, LogLevel::Debug);
        assert_eq!(events[2].level, LogLevel::Warn);
        assert_eq!(events[2].data.get("threshold_ms"), Some(&FieldValue::Int(10)));

        config.features.performance_metrics = false;
        let (logger, sink) = capture(config);
        logger.performance("render", Duration::from_secs(5));
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_request_lifecycle() {
        let (logger, sink) = capture(staging(LogLevel::Info));

        logger.start_request("r1");
        assert!(logger.is_tracking("r1"));
        logger.request("GET /", "r1");
        logger.response("sent", "r1");
        logger.end_request("r1", 200);
        assert_eq!(logger.pending_requests(), 0);

        let events = sink.take();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::Request);
        assert_eq!(events[1].kind, EventKind::Response);
        let summary = &events[2];
        assert_eq!(summary.message, "Request completed");
        assert_eq!(summary.level, LogLevel::Info);
        assert_eq!(summary.data.get("status"), Some(&FieldValue::Int(200)));
        assert!(summary.data.get("duration_ms").and_then(|v| v.as_i64()).unwrap() >= 0);

        // Second end: untracked summary, no duration
        logger.end_request("r1", 200);
        let again = sink.take().remove(0);
        assert!(again.data.get("duration_ms").is_none());
        assert_eq!(again.data.get("tracked"), Some(&FieldValue::Bool(false)));
    }

    #[test]
    fn test_end_request_level_by_status() {
        let (logger, sink) = capture(staging(LogLevel::Info));
        for (id, status) in [("a", 201), ("b", 404), ("c", 503)] {
            logger.start_request(id);
            logger.end_request(id, status);
        }
        let levels: Vec<LogLevel> = sink.take().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Info, LogLevel::Warn, LogLevel::Error]);
    }

    #[test]
    fn test_helpers_below_threshold_emit_nothing() {
        let mut config = staging(LogLevel::Error);
        config.features.performance_metrics = true;
        let (logger, sink) = capture(config);

        logger.http(&HttpRequestSummary::new("GET", "/", 200, Duration::from_millis(1)));
        logger.database("SELECT 1", Duration::from_millis(1), true);
        logger.performance("render", Duration::from_millis(500));
        logger.start_request("quiet");
        logger.end_request("quiet", 200);

        assert!(sink.take().is_empty());
        assert_eq!(logger.pending_requests(), 0);

        logger.start_request("loud");
        logger.end_request("loud", 500);
        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn test_restart_keeps_single_entry() {
        let (logger, _sink) = capture(staging(LogLevel::Info));
        logger.start_request("r1");
        logger.start_request("r1");
        assert_eq!(logger.pending_requests(), 1);
    }

    #[test]
    fn test_tracking_table_evicts_oldest() {
        let sink = MemorySink::default();
        let logger = Logger::builder()
            .config(staging(LogLevel::Info))
            .console_writer(Box::new(std::io::sink()))
            .sink(sink.clone())
            .max_tracked_requests(2)
            .build();

        logger.start_request("first");
        thread::sleep(Duration::from_millis(2));
        logger.start_request("second");
        thread::sleep(Duration::from_millis(2));
        logger.start_request("third");

        assert_eq!(logger.pending_requests(), 2);
        assert!(!logger.is_tracking("first"));
        assert_eq!(logger.metrics().evicted_requests(), 1);
        let warning = sink.take().remove(0);
        assert_eq!(warning.level, LogLevel::Warn);
        assert_eq!(warning.data.get("request_id").and_then(|v| v.as_str()), Some("first"));
    }

    #[test]
    fn test_request_table_shared_with_children() {
        let (parent, _sink) = capture(staging(LogLevel::Info));
        let child = parent.child(LogContext::new());
        parent.start_request("r1");
        assert!(child.is_tracking("r1"));
        child.end_request("r1", 200);
        assert_eq!(parent.pending_requests(), 0);
    }

    #[test]
    fn test_failing_sink_is_isolated() {
        let sink = MemorySink::default();
        let logger = Logger::builder()
            .config(staging(LogLevel::Info))
            .console_writer(Box::new(std::io::sink()))
            .sink(FailingSink)
            .sink(PanickingSink)
            .sink(sink.clone())
            .build();

        logger.info("one");
        logger.info("two");

        assert_eq!(sink.take().len(), 2);
        assert_eq!(logger.metrics().dropped_count(), 2);
        assert_eq!(logger.metrics().total_logged(), 0);
    }

    #[test]
    fn test_shutdown_closes_sinks_once() {
        let (logger, sink) = capture(staging(LogLevel::Info));
        let child = logger.child(LogContext::new());

        child.shutdown("bye");
        logger.shutdown("bye again");

        assert!(logger.is_shut_down());
        assert!(sink.closed.load(Ordering::SeqCst));
        let events = sink.take();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Lifecycle);
        assert_eq!(events[0].data.get("phase").and_then(|v| v.as_str()), Some("shutdown"));
    }

    #[test]
    fn test_file_open_failure_falls_back_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let mut config = staging(LogLevel::Info);
        config.file.enabled = true;
        config.file.directory = blocker.join("logs");
        let (logger, sink) = capture(config);

        assert_eq!(logger.sink_names(), vec!["console", "memory"]);
        logger.info("still works");
        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn test_concurrent_logging_from_children() {
        let (logger, sink) = capture(staging(LogLevel::Info));
        let logger = Arc::new(logger);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let child = logger.child(LogContext::new().with_field("worker", t));
                thread::spawn(move || {
                    for i in 0..50 {
                        child.info(format!("msg {}", i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sink.take().len(), 200);
        assert_eq!(logger.metrics().total_logged(), 200);
    }
}
