//! The per-path monitor facade
//!
//! A [`Monitor`] is what application code holds. It is bound to one dotted
//! path (`root`, `root.api`, ...) of a process context and exposes:
//!
//! - ad-hoc severity methods (`info`, `err`, ...) taking a type tag and fields
//! - typed messages registered with [`Monitor::register`] and emitted with
//!   [`Monitor::log`]
//! - metrics and timing helpers (`count`, `measure`, `timer`, `timed_handler`,
//!   `response_timer`, `time_keeper`, `resources`, `instrument_client`)
//! - error reporting and process-level helpers (`report_error`, `one_shot`,
//!   `spawn_detached`)
//!
//! Facades are cheap to clone; clones share the same logger and type table.

pub mod builtins;
pub mod client;
pub mod error_report;
pub mod message_type;
pub mod resources;
pub mod time_keeper;
pub mod timer;

pub use builtins::{Builtin, BuiltinMessage, CpuUsage, HandlerStatus, MemoryUsage};
pub use client::{ExternalClient, TimedClient};
pub use error_report::ErrorReport;
pub use message_type::{MessageLevel, MessageType, MessageTypeTable};
pub use resources::ResourceSampler;
pub use time_keeper::TimeKeeper;
pub use timer::{Outcome, ResponseTimer};

use crate::core::{Fields, LogLevel, Logger, MonitorError, Result, GENERIC_TYPE};
use crate::manager::context::SamplerSlot;
use crate::manager::ProcessContext;
use builtins::{CountFields, MeasureFields, BUILTIN_VERSION};
use parking_lot::RwLock;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};

#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    path: String,
    logger: Logger,
    metadata: Fields,
    types: Arc<RwLock<MessageTypeTable>>,
    context: Arc<ProcessContext>,
    sampler: SamplerSlot,
}

impl Monitor {
    pub(crate) fn new(
        path: String,
        logger: Logger,
        metadata: Fields,
        types: Arc<RwLock<MessageTypeTable>>,
        sampler: SamplerSlot,
        context: Arc<ProcessContext>,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                path,
                logger,
                metadata,
                types,
                context,
                sampler,
            }),
        }
    }

    /// Path relative to the service, e.g. `root.api`
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Fully-qualified logger name stamped on records
    pub fn name(&self) -> &str {
        self.inner.logger.name()
    }

    pub fn level(&self) -> LogLevel {
        self.inner.logger.level()
    }

    /// Effective metadata attached to every record as `meta`
    pub fn metadata(&self) -> &Fields {
        &self.inner.metadata
    }

    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    pub(crate) fn context(&self) -> &Arc<ProcessContext> {
        &self.inner.context
    }

    /// Create (or look up) the facade at `<path>.<suffix>`
    ///
    /// The child inherits this facade's metadata, overlaid by `metadata`.
    pub fn child(&self, suffix: &str, metadata: Fields) -> Result<Monitor> {
        if suffix.is_empty() {
            return Err(MonitorError::config("Monitor", "child suffix must not be empty"));
        }
        let path = format!("{}.{}", self.inner.path, suffix);
        self.inner
            .context
            .facade(&path, Some(&self.inner.metadata), metadata)
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.logger.flush()
    }

    // Ad-hoc emission

    pub fn emit(&self, level: LogLevel, type_tag: &str, fields: impl Into<Value>) {
        self.inner.logger.log(level, type_tag, fields);
    }

    /// Ad-hoc emission tagged `monitor.generic`
    pub fn generic(&self, level: LogLevel, fields: impl Into<Value>) {
        self.inner.logger.log(level, GENERIC_TYPE, fields);
    }

    pub fn emerg(&self, type_tag: &str, fields: impl Into<Value>) {
        self.emit(LogLevel::Emerg, type_tag, fields);
    }

    pub fn alert(&self, type_tag: &str, fields: impl Into<Value>) {
        self.emit(LogLevel::Alert, type_tag, fields);
    }

    pub fn crit(&self, type_tag: &str, fields: impl Into<Value>) {
        self.emit(LogLevel::Crit, type_tag, fields);
    }

    pub fn err(&self, type_tag: &str, fields: impl Into<Value>) {
        self.emit(LogLevel::Err, type_tag, fields);
    }

    pub fn warning(&self, type_tag: &str, fields: impl Into<Value>) {
        self.emit(LogLevel::Warning, type_tag, fields);
    }

    pub fn notice(&self, type_tag: &str, fields: impl Into<Value>) {
        self.emit(LogLevel::Notice, type_tag, fields);
    }

    pub fn info(&self, type_tag: &str, fields: impl Into<Value>) {
        self.emit(LogLevel::Info, type_tag, fields);
    }

    pub fn debug(&self, type_tag: &str, fields: impl Into<Value>) {
        self.emit(LogLevel::Debug, type_tag, fields);
    }

    // Typed messages

    /// Add a message type to this facade's table
    pub fn register(&self, message_type: MessageType) -> Result<()> {
        self.inner.types.write().register(message_type)
    }

    pub fn message_type(&self, name: &str) -> Option<MessageType> {
        self.inner.types.read().get(name).cloned()
    }

    /// Emit a registered message type at its registered level
    ///
    /// # Example
    ///
    /// ```
    /// use rust_monitor_system::prelude::*;
    /// use serde_json::json;
    ///
    /// let mut manager = MonitorManager::new("taskcluster-queue");
    /// manager
    ///     .register(MessageType::new("createdTask", "queue.createdTask").field("taskId", "id"))
    ///     .unwrap();
    /// manager
    ///     .setup(MonitorConfig::default().with_mock(MockConfig::default()).with_verify(true))
    ///     .unwrap();
    ///
    /// let monitor = manager.root_monitor().unwrap();
    /// monitor.log("createdTask", json!({"taskId": "abc"})).unwrap();
    /// assert!(monitor.log("createdTask", json!({})).is_err());
    /// ```
    pub fn log(&self, name: &str, fields: impl Into<Value>) -> Result<()> {
        self.log_typed(name, fields.into(), None)
    }

    /// Emit a registered message type, overriding the level of `any` types
    pub fn log_with_level(&self, name: &str, fields: impl Into<Value>, level: LogLevel) -> Result<()> {
        self.log_typed(name, fields.into(), Some(level))
    }

    fn log_typed(&self, name: &str, fields: Value, level: Option<LogLevel>) -> Result<()> {
        let (level, type_tag, fields) = {
            let types = self.inner.types.read();
            let message_type = types
                .get(name)
                .ok_or_else(|| MonitorError::UnknownMessageType(name.to_string()))?;
            let (level, fields) = message_type.prepare(fields, level, self.inner.context.verify())?;
            (level, message_type.type_tag.clone(), fields)
        };
        self.inner.logger.log(level, &type_tag, fields);
        Ok(())
    }

    /// Emit a built-in type; the field struct guarantees its shape
    pub(crate) fn emit_builtin<M: BuiltinMessage>(&self, message: &M, level: Option<LogLevel>) {
        let level = level.unwrap_or_else(|| M::KIND.default_level());
        let mut fields = Fields::new();
        fields.insert("v".to_string(), Value::from(BUILTIN_VERSION));
        match serde_json::to_value(message) {
            Ok(Value::Object(map)) => fields.extend(map),
            Ok(other) => {
                fields.insert("message".to_string(), other);
            }
            Err(e) => {
                eprintln!(
                    "[MONITOR ERROR] Failed to serialize '{}' fields: {}",
                    M::KIND.type_tag(),
                    e
                );
                return;
            }
        }
        self.inner.logger.log(level, M::KIND.type_tag(), Value::Object(fields));
    }

    // Metrics

    /// Add `val` to the counter `key`
    ///
    /// A non-numeric value is reported as an error instead.
    pub fn count(&self, key: &str, val: impl Into<Value>) {
        let val = val.into();
        if !val.is_number() {
            self.report_invalid_metric("Count", key, val);
            return;
        }
        self.emit_builtin(&CountFields { key, val: &val }, None);
    }

    /// Add one to the counter `key`
    pub fn increment(&self, key: &str) {
        self.count(key, 1);
    }

    pub fn measure(&self, key: &str, val: impl Into<Value>) {
        let val = val.into();
        if !val.is_number() {
            self.report_invalid_metric("Measure", key, val);
            return;
        }
        self.emit_builtin(&MeasureFields { key, val: &val }, None);
    }

    fn report_invalid_metric(&self, kind: &str, key: &str, val: Value) {
        let mut extra = Fields::new();
        extra.insert("key".to_string(), Value::from(key));
        extra.insert("val".to_string(), val);
        self.report_error_with(MonitorError::invalid_metric(kind, key), LogLevel::Err, extra);
    }

    // Errors

    /// Report an error at `err` level
    pub fn report_error(&self, error: impl Into<ErrorReport>) {
        self.report_error_with(error, LogLevel::Err, Fields::new());
    }

    /// Report an error at `level`, merging `extra` into the record's fields
    pub fn report_error_with(&self, error: impl Into<ErrorReport>, level: LogLevel, extra: Fields) {
        let mut report = error.into();
        report.extra.extend(extra);
        self.emit_builtin(&report, Some(level));
    }

    // Process helpers

    /// Run one unit of work, report its outcome and exit the process
    ///
    /// The work is timed under `name`. A failure (an `Err` or a panic) is
    /// reported as an error. The process then exits with status 0 on success
    /// or 1 on failure, unless the context is in mock mode without
    /// `allow_exit`; the status is returned in that case.
    pub async fn one_shot<F, Fut, T, E>(&self, name: &str, work: F) -> i32
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<ErrorReport>,
    {
        let status = if name.is_empty() {
            self.report_error(ErrorReport::new("Error", "Must provide a name to oneShot"));
            1
        } else {
            let timed = self.timer_async(name, async move { work().await });
            match Outcome::observe_future(timed).await {
                Outcome::Completed(Ok(_)) => 0,
                Outcome::Completed(Err(e)) => {
                    self.report_error(e);
                    1
                }
                Outcome::Panicked(payload) => {
                    self.report_error(ErrorReport::from_panic(payload.as_ref()));
                    1
                }
            }
        };

        if let Err(e) = self.flush() {
            eprintln!("[MONITOR ERROR] Flush before exit failed: {}", e);
        }
        self.inner.context.exit(status);
        status
    }

    /// Spawn a detached task on the current tokio runtime
    ///
    /// Nobody awaits the task, so an `Err` it resolves to is an unhandled
    /// failure: with crash interception installed it is reported (and is
    /// fatal when the context bails on unhandled failures), otherwise a
    /// warning is printed to stderr.
    pub fn spawn_detached<F, T, E>(&self, future: F) -> Result<JoinHandle<()>>
    where
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Into<ErrorReport> + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|_| {
            MonitorError::config("spawnDetached", "must be called within a tokio runtime")
        })?;
        let monitor = self.clone();
        Ok(handle.spawn(async move {
            if let Err(e) = future.await {
                let context = Arc::clone(monitor.context());
                context.unhandled_failure(&monitor, e.into());
            }
        }))
    }

    fn replace_sampler(&self, sampler: Option<AbortHandle>) -> Option<AbortHandle> {
        std::mem::replace(&mut *self.inner.sampler.lock(), sampler)
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("path", &self.inner.path)
            .field("logger", &self.inner.logger)
            .finish_non_exhaustive()
    }
}
