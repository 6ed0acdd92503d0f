//! Sink trait for log output destinations

use super::{error::Result, log_event::LogEvent};

/// A destination for rendered events.
///
/// Sinks are composed once when a [`Logger`](crate::Logger) is built and are
/// shared by every child of that logger, so all methods take `&self`; a sink
/// owning mutable state guards it internally. Each sink renders the event in
/// its own format.
pub trait Sink: Send + Sync {
    fn emit(&self, event: &LogEvent) -> Result<()>;

    fn flush(&self) -> Result<()>;

    /// Release resources. Must be idempotent.
    fn close(&self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str;
}
