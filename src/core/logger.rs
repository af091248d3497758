//! Record formatter and level gate
//!
//! A `Logger` is bound to one fully-qualified dotted name and one resolved
//! threshold. Every emission in the system ends up in [`Logger::log`], which
//! is the single place where severities are compared against the threshold.

use super::{
    appender::Appender,
    error::{MonitorError, Result},
    log_level::LogLevel,
    log_record::{display_value, Fields, LogRecord, ServiceContext, ENV_VERSION},
    metrics::LoggerMetrics,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::cell::Cell;
use std::sync::Arc;

/// Type tag used when an ad-hoc call gives none
pub const GENERIC_TYPE: &str = "monitor.generic";

/// Type tag of records synthesized from invalid log calls
pub const LOGGING_ERROR_TYPE: &str = "monitor.loggingError";

/// Appender shared by all loggers of one process context
pub type SharedAppender = Arc<Mutex<Box<dyn Appender>>>;

thread_local! {
    static APPENDING: Cell<bool> = const { Cell::new(false) };
}

/// True while this thread holds an appender lock
///
/// A panic raised inside an appender must not try to log through the same
/// appender again.
pub fn is_appending() -> bool {
    APPENDING.with(Cell::get)
}

/// Per-process values stamped on every record
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessIdentity {
    pub service: String,
    pub git_version: Option<String>,
    pub hostname: String,
    pub pid: u32,
}

impl ProcessIdentity {
    /// Identity of the running process
    pub fn current(service: impl Into<String>, git_version: Option<String>) -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            service: service.into(),
            git_version,
            hostname,
            pid: std::process::id(),
        }
    }
}

#[derive(Clone)]
pub struct Logger {
    name: String,
    level: LogLevel,
    metadata: Option<Arc<Fields>>,
    identity: Arc<ProcessIdentity>,
    appender: SharedAppender,
    metrics: Arc<LoggerMetrics>,
}

impl Logger {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn metadata(&self) -> Option<&Fields> {
        self.metadata.as_deref()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Emit one record
    ///
    /// `fields` may be a map (used as-is), a string or number (wrapped as
    /// `{message: value}`), or anything else, in which case the call is
    /// downgraded to an `err` record of type `monitor.loggingError`
    /// describing the bad input. A `meta` key in caller fields is downgraded
    /// the same way. This never fails or panics on bad input.
    pub fn log(&self, level: LogLevel, type_tag: &str, fields: impl Into<Value>) {
        if !self.level.allows(level) {
            self.metrics.record_suppressed();
            return;
        }

        let (level, type_tag, mut fields) = self.normalize(level, type_tag, fields.into());

        if let Some(ref metadata) = self.metadata {
            fields.insert("meta".to_string(), Value::Object((**metadata).clone()));
        }

        let message = ["stack", "message"]
            .iter()
            .filter_map(|key| fields.get(*key))
            .find(|value| !matches!(value, Value::Null) && value.as_str() != Some(""))
            .map(display_value);

        let record = LogRecord {
            timestamp: chrono::Utc::now().timestamp_millis() * 1_000_000,
            type_tag,
            logger: self.name.clone(),
            hostname: self.identity.hostname.clone(),
            env_version: ENV_VERSION.to_string(),
            severity: level,
            pid: self.identity.pid,
            fields,
            message,
            severity_name: level.label().to_string(),
            service_context: ServiceContext {
                service: self.identity.service.clone(),
                version: self.identity.git_version.clone(),
            },
        };

        self.write(&record);
    }

    /// Emit with the `monitor.generic` type tag
    pub fn log_generic(&self, level: LogLevel, fields: impl Into<Value>) {
        self.log(level, GENERIC_TYPE, fields);
    }

    fn normalize(&self, level: LogLevel, type_tag: &str, fields: Value) -> (LogLevel, String, Fields) {
        match fields {
            Value::Object(map) if map.contains_key("meta") => self.downgrade(
                type_tag,
                "You may not set meta fields on logs directly.",
                Value::Object(map),
            ),
            Value::Object(map) => (level, type_tag.to_string(), map),
            value @ (Value::String(_) | Value::Number(_)) => {
                let mut map = Fields::new();
                map.insert("message".to_string(), value);
                (level, type_tag.to_string(), map)
            }
            other => self.downgrade(type_tag, "Invalid field to be logged.", other),
        }
    }

    fn downgrade(&self, orig_type: &str, error: &str, orig: Value) -> (LogLevel, String, Fields) {
        self.metrics.record_downgraded();
        let fields = match json!({
            "error": error,
            "origType": orig_type,
            "orig": orig,
        }) {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        (LogLevel::Err, LOGGING_ERROR_TYPE.to_string(), fields)
    }

    /// Hand the record to the appender with panic isolation
    fn write(&self, record: &LogRecord) {
        let mut appender = self.appender.lock();
        APPENDING.with(|flag| flag.set(true));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            appender.append(record)
        }));
        APPENDING.with(|flag| flag.set(false));

        match result {
            Ok(Ok(())) => {
                self.metrics.record_written();
            }
            Ok(Err(e)) => {
                eprintln!("[MONITOR ERROR] Appender '{}' failed: {}", appender.name(), e);
                self.metrics.record_failed();
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                eprintln!(
                    "[MONITOR CRITICAL] Appender '{}' panicked: {}",
                    appender.name(),
                    panic_msg
                );
                self.metrics.record_failed();
            }
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.appender.lock().flush()
    }

    #[inline]
    pub fn emerg(&self, type_tag: &str, fields: impl Into<Value>) {
        self.log(LogLevel::Emerg, type_tag, fields);
    }

    #[inline]
    pub fn alert(&self, type_tag: &str, fields: impl Into<Value>) {
        self.log(LogLevel::Alert, type_tag, fields);
    }

    #[inline]
    pub fn crit(&self, type_tag: &str, fields: impl Into<Value>) {
        self.log(LogLevel::Crit, type_tag, fields);
    }

    #[inline]
    pub fn err(&self, type_tag: &str, fields: impl Into<Value>) {
        self.log(LogLevel::Err, type_tag, fields);
    }

    #[inline]
    pub fn warning(&self, type_tag: &str, fields: impl Into<Value>) {
        self.log(LogLevel::Warning, type_tag, fields);
    }

    #[inline]
    pub fn notice(&self, type_tag: &str, fields: impl Into<Value>) {
        self.log(LogLevel::Notice, type_tag, fields);
    }

    #[inline]
    pub fn info(&self, type_tag: &str, fields: impl Into<Value>) {
        self.log(LogLevel::Info, type_tag, fields);
    }

    #[inline]
    pub fn debug(&self, type_tag: &str, fields: impl Into<Value>) {
        self.log(LogLevel::Debug, type_tag, fields);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a Logger with a fluent API
///
/// # Example
/// ```
/// use rust_monitor_system::prelude::*;
///
/// let logger = Logger::builder("svc.root")
///     .service("svc")
///     .level(LogLevel::Debug)
///     .appender(ConsoleAppender::new())
///     .build()
///     .unwrap();
/// logger.info("monitor.generic", "started");
/// ```
pub struct LoggerBuilder {
    name: String,
    level: LogLevel,
    metadata: Fields,
    identity: Option<Arc<ProcessIdentity>>,
    service: String,
    git_version: Option<String>,
    appender: Option<SharedAppender>,
    metrics: Option<Arc<LoggerMetrics>>,
}

impl LoggerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: LogLevel::Info,
            metadata: Fields::new(),
            identity: None,
            service: String::new(),
            git_version: None,
            appender: None,
            metrics: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Metadata attached as the reserved `meta` field of every record
    #[must_use = "builder methods return a new value"]
    pub fn metadata(mut self, metadata: Fields) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn git_version(mut self, version: impl Into<String>) -> Self {
        self.git_version = Some(version.into());
        self
    }

    /// Use an already-resolved process identity (overrides `service`)
    #[must_use = "builder methods return a new value"]
    pub fn identity(mut self, identity: Arc<ProcessIdentity>) -> Self {
        self.identity = Some(identity);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn appender<A: Appender + 'static>(mut self, appender: A) -> Self {
        self.appender = Some(Arc::new(Mutex::new(Box::new(appender))));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shared_appender(mut self, appender: SharedAppender) -> Self {
        self.appender = Some(appender);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn metrics(mut self, metrics: Arc<LoggerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Logger> {
        if self.name.trim().is_empty() {
            return Err(MonitorError::config("Logger", "Must specify Logger name."));
        }

        let identity = match self.identity {
            Some(identity) => identity,
            None => Arc::new(ProcessIdentity::current(self.service, self.git_version)),
        };

        let appender = match self.appender {
            Some(appender) => appender,
            None => Arc::new(Mutex::new(
                Box::new(crate::appenders::ConsoleAppender::new()) as Box<dyn Appender>
            )),
        };

        Ok(Logger {
            name: self.name,
            level: self.level,
            metadata: if self.metadata.is_empty() {
                None
            } else {
                Some(Arc::new(self.metadata))
            },
            identity,
            appender,
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appenders::{CaptureAppender, MessageCapture};

    fn capture_logger(level: LogLevel, metadata: Fields) -> (Logger, MessageCapture) {
        let capture = MessageCapture::new();
        let logger = Logger::builder("proj.svc.root")
            .service("svc")
            .level(level)
            .metadata(metadata)
            .appender(CaptureAppender::new(capture.clone()))
            .build()
            .unwrap();
        (logger, capture)
    }

    #[test]
    fn test_builder_requires_name() {
        assert!(Logger::builder("  ").build().is_err());
    }

    #[test]
    fn test_threshold_gates_emission() {
        let (logger, capture) = capture_logger(LogLevel::Notice, Fields::new());
        logger.info("a.b", json!({"x": 1}));
        logger.notice("a.b", json!({"x": 2}));
        logger.err("a.b", json!({"x": 3}));

        let messages = capture.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].severity, LogLevel::Notice);
        assert_eq!(messages[1].severity, LogLevel::Err);
        assert_eq!(logger.metrics().suppressed_count(), 1);
        assert_eq!(logger.metrics().written_count(), 2);
    }

    #[test]
    fn test_envelope_fields() {
        let (logger, capture) = capture_logger(LogLevel::Debug, Fields::new());
        logger.warning("svc.thing", json!({"message": "hi", "n": 5}));

        let record = &capture.messages()[0];
        assert_eq!(record.type_tag, "svc.thing");
        assert_eq!(record.logger, "proj.svc.root");
        assert_eq!(record.env_version, "2.0");
        assert_eq!(record.severity_name, "WARNING");
        assert_eq!(record.pid, std::process::id());
        assert_eq!(record.message.as_deref(), Some("hi"));
        assert_eq!(record.service_context.service, "svc");
        assert_eq!(record.timestamp % 1_000_000, 0);
        assert!(record.meta().is_none());
    }

    #[test]
    fn test_scalar_fields_are_wrapped() {
        let (logger, capture) = capture_logger(LogLevel::Debug, Fields::new());
        logger.info("t", "hello");
        logger.info("t", 42);

        let messages = capture.messages();
        assert_eq!(messages[0].field("message"), Some(&json!("hello")));
        assert_eq!(messages[1].field("message"), Some(&json!(42)));
        assert_eq!(messages[1].message.as_deref(), Some("42"));
    }

    #[test]
    fn test_invalid_fields_are_downgraded() {
        let (logger, capture) = capture_logger(LogLevel::Debug, Fields::new());
        logger.info("svc.thing", Value::Null);
        logger.debug("svc.other", true);

        let messages = capture.messages();
        assert_eq!(messages.len(), 2);
        for (record, orig_type) in messages.iter().zip(["svc.thing", "svc.other"]) {
            assert_eq!(record.severity, LogLevel::Err);
            assert_eq!(record.type_tag, LOGGING_ERROR_TYPE);
            assert_eq!(record.field("origType"), Some(&json!(orig_type)));
            assert_eq!(record.field("error"), Some(&json!("Invalid field to be logged.")));
        }
        assert_eq!(messages[1].field("orig"), Some(&json!(true)));
        assert_eq!(logger.metrics().downgraded_count(), 2);
    }

    #[test]
    fn test_caller_meta_is_rejected() {
        let mut metadata = Fields::new();
        metadata.insert("region".into(), json!("us-east"));
        let (logger, capture) = capture_logger(LogLevel::Debug, metadata);
        logger.info("svc.thing", json!({"meta": {"sneaky": true}}));

        let record = &capture.messages()[0];
        assert_eq!(record.severity, LogLevel::Err);
        assert_eq!(
            record.field("error"),
            Some(&json!("You may not set meta fields on logs directly."))
        );
        assert_eq!(record.field("orig"), Some(&json!({"meta": {"sneaky": true}})));
        assert_eq!(record.meta().unwrap()["region"], json!("us-east"));
    }

    #[test]
    fn test_suppressed_invalid_fields_produce_nothing() {
        let (logger, capture) = capture_logger(LogLevel::Info, Fields::new());
        logger.debug("t", Value::Null);
        assert!(capture.is_empty());
    }

    #[test]
    fn test_stack_preferred_for_message() {
        let (logger, capture) = capture_logger(LogLevel::Info, Fields::new());
        logger.err("t", json!({"message": "m", "stack": "s\nat x"}));
        assert_eq!(capture.messages()[0].message.as_deref(), Some("s\nat x"));
    }

    #[test]
    fn test_failing_appender_does_not_propagate() {
        struct FailingAppender;

        impl Appender for FailingAppender {
            fn append(&mut self, _record: &LogRecord) -> Result<()> {
                Err(MonitorError::other("Simulated failure"))
            }

            fn flush(&mut self) -> Result<()> {
                Ok(())
            }

            fn name(&self) -> &str {
                "failing"
            }
        }

        let logger = Logger::builder("svc.root")
            .appender(FailingAppender)
            .build()
            .unwrap();
        for _ in 0..3 {
            logger.info("t", "x");
        }
        assert_eq!(logger.metrics().failed_count(), 3);
    }
}
