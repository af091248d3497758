//! Emission counters for observability
//!
//! Tracks how many records were written, suppressed by level, downgraded to
//! logging-error records, or lost to a failing appender.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every logger of one process context
///
/// # Example
///
/// ```
/// use rust_monitor_system::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_written();
/// metrics.record_suppressed();
///
/// assert_eq!(metrics.written_count(), 1);
/// assert_eq!(metrics.suppressed_count(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records handed to the appender successfully
    written: AtomicU64,

    /// Calls below the logger's threshold
    suppressed: AtomicU64,

    /// Calls whose fields were invalid and were replaced by an error record
    downgraded: AtomicU64,

    /// Records the appender failed to write
    failed: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            written: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            downgraded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn written_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn downgraded_count(&self) -> u64 {
        self.downgraded.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Record a written entry, returning the previous count
    #[inline]
    pub fn record_written(&self) -> u64 {
        self.written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_suppressed(&self) -> u64 {
        self.suppressed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_downgraded(&self) -> u64 {
        self.downgraded.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed)
    }

    /// Failure rate as a percentage (0.0 - 100.0) of attempted writes
    pub fn failure_rate(&self) -> f64 {
        let failed = self.failed_count() as f64;
        let total = self.written_count() as f64 + failed;
        if total == 0.0 {
            0.0
        } else {
            (failed / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.written.store(0, Ordering::Relaxed);
        self.suppressed.store(0, Ordering::Relaxed);
        self.downgraded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current counter values
    fn clone(&self) -> Self {
        Self {
            written: AtomicU64::new(self.written_count()),
            suppressed: AtomicU64::new(self.suppressed_count()),
            downgraded: AtomicU64::new(self.downgraded_count()),
            failed: AtomicU64::new(self.failed_count()),
        }
    }
}
