//! Hierarchical registry of monitors
//!
//! A [`MonitorManager`] is created once per service. Message types are
//! registered on it before [`MonitorManager::setup`]; after setup it hands
//! out [`Monitor`] facades for dotted paths below `root`, each with its own
//! resolved level and metadata.

pub mod config;
pub mod context;
pub mod crash;
pub mod level_spec;

pub use config::{MockConfig, MonitorConfig};
pub use context::{ExitHandler, ProcessContext};
pub use crash::CrashInterceptor;
pub use level_spec::LevelSpec;

use crate::appenders::{CaptureAppender, ConsoleAppender, FileAppender, MessageCapture};
use crate::core::{
    Appender, Fields, LogRecord, LoggerMetrics, MonitorError, OutputFormat, ProcessIdentity, Result,
    SharedAppender,
};
use crate::monitor::{MessageType, MessageTypeTable, Monitor};
use context::{process_exit, ContextSettings};
use level_spec::ROOT;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

/// Owner of one service's monitoring setup
///
/// # Example
///
/// ```
/// use rust_monitor_system::prelude::*;
/// use serde_json::json;
///
/// let mut manager = MonitorManager::new("taskcluster-queue").with_project("taskcluster");
/// manager
///     .setup(
///         MonitorConfig::default()
///             .with_level("root:info root.api:debug")
///             .with_mock(MockConfig::default()),
///     )
///     .unwrap();
///
/// let api = manager.monitor("api").unwrap();
/// api.debug("queue.request", json!({"path": "/task"}));
/// manager.root_monitor().unwrap().debug("queue.request", json!({"path": "/"}));
///
/// let messages = manager.messages();
/// assert_eq!(messages.len(), 1);
/// assert_eq!(messages[0].logger, "taskcluster.taskcluster-queue.root.api");
/// ```
pub struct MonitorManager {
    service: String,
    project: Option<String>,
    types: MessageTypeTable,
    appender: Option<Box<dyn Appender>>,
    exit_handler: Option<ExitHandler>,
    context: Option<Arc<ProcessContext>>,
    root: Option<Monitor>,
}

impl MonitorManager {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            project: None,
            types: MessageTypeTable::with_builtins(),
            appender: None,
            exit_handler: None,
            context: None,
            root: None,
        }
    }

    /// Prefix logger names with a project name
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Write records to `appender` instead of stdout (ignored in mock mode)
    #[must_use]
    pub fn with_appender<A: Appender + 'static>(mut self, appender: A) -> Self {
        self.appender = Some(Box::new(appender));
        self
    }

    /// Replace `std::process::exit` for `one_shot` and crash interception
    #[must_use]
    pub fn with_exit_handler(mut self, handler: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit_handler = Some(Arc::new(handler));
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Register a message type for every facade of this service
    pub fn register(&mut self, message_type: MessageType) -> Result<()> {
        if self.context.is_some() {
            return Err(MonitorError::AlreadySetUp);
        }
        self.types.register(message_type)
    }

    pub fn setup(&mut self, config: MonitorConfig) -> Result<()> {
        if self.context.is_some() {
            return Err(MonitorError::AlreadySetUp);
        }
        if self.service.trim().is_empty() {
            return Err(MonitorError::config("MonitorManager", "Must specify a service name."));
        }

        let levels: LevelSpec = config.level.parse()?;
        let (appender, capture) = self.make_appender(&config)?;

        let context = ProcessContext::new(ContextSettings {
            project: self.project.clone(),
            identity: Arc::new(ProcessIdentity::current(
                self.service.clone(),
                config.git_version.clone(),
            )),
            levels,
            verify: config.verify,
            appender,
            capture,
            mock: config.mock,
            bail_on_unhandled_rejection: config.bail_on_unhandled_rejection,
            base_types: self.types.clone(),
            exit_handler: self.exit_handler.clone().unwrap_or_else(process_exit),
        });

        let root = match Self::start(&context, &config) {
            Ok(root) => root,
            Err(e) => {
                context.shutdown();
                return Err(e);
            }
        };

        self.context = Some(context);
        self.root = Some(root);
        Ok(())
    }

    fn make_appender(
        &mut self,
        config: &MonitorConfig,
    ) -> Result<(SharedAppender, Option<MessageCapture>)> {
        let format = OutputFormat::from_pretty(config.pretty);
        if config.mock.is_some() {
            let capture = MessageCapture::new();
            let appender: Box<dyn Appender> = Box::new(CaptureAppender::new(capture.clone()));
            return Ok((Arc::new(Mutex::new(appender)), Some(capture)));
        }

        let appender: Box<dyn Appender> = match (self.appender.take(), &config.destination) {
            (Some(custom), _) => custom,
            (None, Some(path)) => Box::new(FileAppender::new(path)?.with_output_format(format)),
            (None, None) => {
                Box::new(ConsoleAppender::with_colors(config.pretty).with_output_format(format))
            }
        };
        Ok((Arc::new(Mutex::new(appender)), None))
    }

    fn start(context: &Arc<ProcessContext>, config: &MonitorConfig) -> Result<Monitor> {
        let root = context.facade(ROOT, None, Fields::new())?;
        if config.patch_global {
            context.install_interceptor(root.clone());
        }
        if let Some(ref process_name) = config.process_name {
            // stopped through terminate
            let _stop = root.resources(process_name.clone(), config.resource_interval())?;
        }
        Ok(root)
    }

    pub fn is_set_up(&self) -> bool {
        self.context.is_some()
    }

    pub fn context(&self) -> Option<&Arc<ProcessContext>> {
        self.context.as_ref()
    }

    pub fn root_monitor(&self) -> Result<Monitor> {
        self.root.clone().ok_or(MonitorError::NotSetUp)
    }

    /// Facade for `root.<suffix>`, or `root` when `suffix` is empty
    pub fn monitor(&self, suffix: &str) -> Result<Monitor> {
        self.monitor_with_metadata(suffix, Fields::new())
    }

    pub fn monitor_with_metadata(&self, suffix: &str, metadata: Fields) -> Result<Monitor> {
        let context = self.context.as_ref().ok_or(MonitorError::NotSetUp)?;
        let path = if suffix.is_empty() {
            ROOT.to_string()
        } else {
            format!("{}.{}", ROOT, suffix)
        };
        context.facade(&path, None, metadata)
    }

    /// Captured records in emission order (mock mode only)
    pub fn messages(&self) -> Vec<LogRecord> {
        self.capture().map(MessageCapture::messages).unwrap_or_default()
    }

    pub fn drain_messages(&self) -> Vec<LogRecord> {
        self.capture().map(MessageCapture::drain).unwrap_or_default()
    }

    pub fn clear_messages(&self) {
        if let Some(capture) = self.capture() {
            capture.clear();
        }
    }

    fn capture(&self) -> Option<&MessageCapture> {
        self.context.as_ref().and_then(|c| c.capture())
    }

    /// Snapshot of the emission counters
    pub fn metrics(&self) -> Option<LoggerMetrics> {
        self.context.as_ref().map(|c| c.metrics().clone())
    }

    /// Registered message types as JSON, service types first
    pub fn reference(&self) -> Value {
        let (builtins, service): (Vec<&MessageType>, Vec<&MessageType>) =
            self.types.iter().partition(|t| t.is_builtin());
        let types: Vec<&MessageType> = service.into_iter().chain(builtins).collect();
        json!({
            "serviceName": self.service,
            "types": types,
        })
    }

    /// Stop samplers, uninstall crash interception and release the capture
    pub fn terminate(&mut self) {
        self.root = None;
        if let Some(context) = self.context.take() {
            context.shutdown();
        }
    }
}

impl Drop for MonitorManager {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for MonitorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorManager")
            .field("service", &self.service)
            .field("project", &self.project)
            .field("types", &self.types.len())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
