//! Logger metrics for observability
//!
//! Counters describing how the logger itself is doing: events that reached
//! every sink, events some sink failed to take, and request-tracking entries
//! evicted by the leak guard.

use std::sync::atomic::{AtomicU64, Ordering};

/// # Example
///
/// ```
/// use applog::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_logged();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.total_logged(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Events at least one sink failed to write
    dropped_count: AtomicU64,

    /// Events written by every sink
    total_logged: AtomicU64,

    /// Request-tracking entries discarded because the table was full
    evicted_requests: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            dropped_count: AtomicU64::new(0),
            total_logged: AtomicU64::new(0),
            evicted_requests: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn evicted_requests(&self) -> u64 {
        self.evicted_requests.load(Ordering::Relaxed)
    }

    /// Record a dropped event; returns the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a fully written event; returns the previous count
    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_evicted_request(&self) -> u64 {
        self.evicted_requests.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no logs have been processed.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_logged() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.dropped_count.store(0, Ordering::Relaxed);
        self.total_logged.store(0, Ordering::Relaxed);
        self.evicted_requests.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            dropped_count: AtomicU64::new(self.dropped_count()),
            total_logged: AtomicU64::new(self.total_logged()),
            evicted_requests: AtomicU64::new(self.evicted_requests()),
        }
    }
}
