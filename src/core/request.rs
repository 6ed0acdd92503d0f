//! Request scope guard
//!
//! Wraps the request tracking calls on [`Logger`] so an HTTP layer only has
//! to open a scope and finish it with the response status. A scope dropped
//! without [`finish`](RequestScope::finish), for instance because the
//! handler panicked or returned early with `?`, is closed as a 500.

use super::log_context::LogContext;
use super::logger::Logger;
use uuid::Uuid;

/// Status recorded for a scope dropped without being finished
pub const ABANDONED_STATUS: u16 = 500;

#[must_use = "dropping the scope immediately ends the request as failed"]
pub struct RequestScope<'a> {
    logger: &'a Logger,
    id: String,
    finished: bool,
}

impl<'a> RequestScope<'a> {
    fn start(logger: &'a Logger, id: String) -> Self {
        logger.start_request(&id);
        Self {
            logger,
            id,
            finished: false,
        }
    }

    /// Correlation id of this request
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn request(&self, message: impl Into<String>) {
        self.logger.request(message, &self.id);
    }

    pub fn response(&self, message: impl Into<String>) {
        self.logger.response(message, &self.id);
    }

    /// Child logger whose context carries `request_id`
    pub fn logger(&self) -> Logger {
        self.logger
            .child(LogContext::new().with_field("request_id", self.id.as_str()))
    }

    /// Emit the completion summary with `status`
    pub fn finish(mut self, status: u16) {
        self.finished = true;
        self.logger.end_request(&self.id, status);
    }
}

impl Drop for RequestScope<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.logger.error_with_data(
            "Request failed: scope ended without a response",
            LogContext::new()
                .with_field("request_id", self.id.as_str())
                .with_field("tags", vec!["ERROR"]),
        );
        self.logger.end_request(&self.id, ABANDONED_STATUS);
    }
}

impl Logger {
    /// Start tracking a request under a fresh UUID v4
    ///
    /// # Example
    ///
    /// ```
    /// use applog::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .console_writer(Box::new(std::io::sink()))
    ///     .build();
    ///
    /// let scope = logger.begin_request();
    /// scope.request("GET /health");
    /// scope.response("Response sent: 200");
    /// scope.finish(200);
    /// assert_eq!(logger.pending_requests(), 0);
    /// ```
    pub fn begin_request(&self) -> RequestScope<'_> {
        RequestScope::start(self, Uuid::new_v4().to_string())
    }

    /// Start tracking a request under a caller-provided id
    pub fn begin_request_with_id(&self, id: impl Into<String>) -> RequestScope<'_> {
        RequestScope::start(self, id.into())
    }
}
