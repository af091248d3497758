//! Deferred timer

use super::timer::millis;
use super::Monitor;
use crate::core::{MonitorError, Result};
use serde_json::Value;
use std::time::Instant;

/// Measures the time from its creation until [`TimeKeeper::measure`]
///
/// The first `measure` emits a `monitor.measure` record with the elapsed
/// milliseconds. Later calls fail unless forced.
#[derive(Debug)]
pub struct TimeKeeper {
    monitor: Monitor,
    key: String,
    start: Instant,
    submitted: bool,
}

impl TimeKeeper {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Emit the elapsed time, returning it in milliseconds
    pub fn measure(&mut self, force: bool) -> Result<f64> {
        if self.submitted && !force {
            return Err(MonitorError::AlreadySubmitted {
                key: self.key.clone(),
            });
        }
        let elapsed = millis(self.start.elapsed());
        self.monitor.measure(&self.key, Value::from(elapsed));
        self.submitted = true;
        Ok(elapsed)
    }
}

impl Monitor {
    pub fn time_keeper(&self, key: impl Into<String>) -> TimeKeeper {
        TimeKeeper {
            monitor: self.clone(),
            key: key.into(),
            start: Instant::now(),
            submitted: false,
        }
    }
}
