//! In-memory capture for mock mode
//!
//! Every logger of a mock-mode process context writes into one shared,
//! ordered `MessageCapture` instead of a real sink.

use crate::core::{Appender, LogRecord, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Ordered, shared list of captured records
#[derive(Debug, Clone, Default)]
pub struct MessageCapture {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MessageCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: LogRecord) {
        self.records.lock().push(record);
    }

    /// Snapshot of all captured records, in emission order
    pub fn messages(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Remove and return all captured records
    pub fn drain(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

/// Appender that pushes records into a [`MessageCapture`]
pub struct CaptureAppender {
    capture: MessageCapture,
}

impl CaptureAppender {
    pub fn new(capture: MessageCapture) -> Self {
        Self { capture }
    }
}

impl Appender for CaptureAppender {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        self.capture.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "capture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Logger;

    #[test]
    fn test_capture_preserves_order_across_loggers() {
        let capture = MessageCapture::new();
        let a = Logger::builder("svc.root")
            .appender(CaptureAppender::new(capture.clone()))
            .build()
            .unwrap();
        let b = Logger::builder("svc.root.api")
            .appender(CaptureAppender::new(capture.clone()))
            .build()
            .unwrap();

        a.info("t", "one");
        b.info("t", "two");
        a.info("t", "three");

        let loggers: Vec<String> = capture.messages().into_iter().map(|r| r.logger).collect();
        assert_eq!(loggers, vec!["svc.root", "svc.root.api", "svc.root"]);
    }

    #[test]
    fn test_drain_and_clear() {
        let capture = MessageCapture::new();
        let logger = Logger::builder("svc.root")
            .appender(CaptureAppender::new(capture.clone()))
            .build()
            .unwrap();

        logger.info("t", "one");
        logger.info("t", "two");
        assert_eq!(capture.drain().len(), 2);
        assert!(capture.is_empty());

        logger.info("t", "three");
        assert_eq!(capture.len(), 1);
        capture.clear();
        assert!(capture.messages().is_empty());
    }
}
