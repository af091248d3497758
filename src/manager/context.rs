//! Process-scoped monitoring state
//!
//! Everything that is process-wide in a monitoring setup lives here: the
//! shared appender (or mock capture), the logger tree with per-path metadata
//! and type tables, running resource samplers and the crash interceptor.
//! One context is created per `setup` and torn down by `shutdown`, so
//! independent managers never share state.

use super::config::MockConfig;
use super::crash::{reason, CrashInterceptor};
use super::level_spec::{LevelSpec, ROOT};
use crate::appenders::MessageCapture;
use crate::core::{
    Fields, LogLevel, Logger, LoggerMetrics, MonitorError, ProcessIdentity, Result, SharedAppender,
};
use crate::monitor::{ErrorReport, MessageTypeTable, Monitor};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::AbortHandle;

/// Called with the exit status when the library terminates the process
pub type ExitHandler = Arc<dyn Fn(i32) + Send + Sync>;

pub(crate) fn process_exit() -> ExitHandler {
    Arc::new(|status| std::process::exit(status))
}

/// Resource sampler running for one logger path
pub(crate) type SamplerSlot = Arc<Mutex<Option<AbortHandle>>>;

struct LoggerNode {
    metadata: Fields,
    types: Arc<RwLock<MessageTypeTable>>,
    sampler: SamplerSlot,
}

pub struct ProcessContext {
    pub(super) project: Option<String>,
    pub(super) identity: Arc<ProcessIdentity>,
    pub(super) levels: LevelSpec,
    pub(super) verify: bool,
    pub(super) appender: SharedAppender,
    pub(super) capture: Option<MessageCapture>,
    pub(super) mock: Option<MockConfig>,
    pub(super) bail_on_unhandled_rejection: bool,
    pub(super) metrics: Arc<LoggerMetrics>,
    pub(super) base_types: MessageTypeTable,
    pub(super) exit_handler: ExitHandler,
    nodes: Mutex<HashMap<String, LoggerNode>>,
    samplers: Mutex<Vec<AbortHandle>>,
    interceptor: Mutex<Option<CrashInterceptor>>,
}

/// Settings a context is created from
pub(super) struct ContextSettings {
    pub project: Option<String>,
    pub identity: Arc<ProcessIdentity>,
    pub levels: LevelSpec,
    pub verify: bool,
    pub appender: SharedAppender,
    pub capture: Option<MessageCapture>,
    pub mock: Option<MockConfig>,
    pub bail_on_unhandled_rejection: bool,
    pub base_types: MessageTypeTable,
    pub exit_handler: ExitHandler,
}

impl ProcessContext {
    pub(super) fn new(settings: ContextSettings) -> Arc<Self> {
        Arc::new(Self {
            project: settings.project,
            identity: settings.identity,
            levels: settings.levels,
            verify: settings.verify,
            appender: settings.appender,
            capture: settings.capture,
            mock: settings.mock,
            bail_on_unhandled_rejection: settings.bail_on_unhandled_rejection,
            metrics: Arc::new(LoggerMetrics::new()),
            base_types: settings.base_types,
            exit_handler: settings.exit_handler,
            nodes: Mutex::new(HashMap::new()),
            samplers: Mutex::new(Vec::new()),
            interceptor: Mutex::new(None),
        })
    }

    pub fn verify(&self) -> bool {
        self.verify
    }

    pub fn is_mock(&self) -> bool {
        self.mock.is_some()
    }

    pub fn capture(&self) -> Option<&MessageCapture> {
        self.capture.as_ref()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn levels(&self) -> &LevelSpec {
        &self.levels
    }

    /// `<project>.<service>.<path>`, or `<service>.<path>` without a project
    pub fn logger_name(&self, path: &str) -> String {
        match &self.project {
            Some(project) => format!("{}.{}.{}", project, self.identity.service, path),
            None => format!("{}.{}", self.identity.service, path),
        }
    }

    /// Facade for `path`
    ///
    /// Its metadata is `inherited` (or, when absent, the stored metadata of
    /// every ancestor path, root first) overlaid by `metadata`. Non-empty
    /// `metadata` replaces what is stored for `path`. All facades for one
    /// path share a type table and a resource sampler slot.
    pub(crate) fn facade(
        self: &Arc<Self>,
        path: &str,
        inherited: Option<&Fields>,
        metadata: Fields,
    ) -> Result<Monitor> {
        if (path != ROOT && !path.starts_with("root.")) || path.split('.').any(str::is_empty) {
            return Err(MonitorError::config(
                "monitor",
                format!("invalid logger path `{}`", path),
            ));
        }

        let (effective, types, sampler) = {
            let mut nodes = self.nodes.lock();
            let mut effective = match inherited {
                Some(inherited) => inherited.clone(),
                None => {
                    let mut merged = Fields::new();
                    for ancestor in ancestors(path) {
                        if let Some(node) = nodes.get(ancestor) {
                            merged.extend(node.metadata.clone());
                        }
                    }
                    merged
                }
            };
            effective.extend(metadata.clone());

            let node = nodes.entry(path.to_string()).or_insert_with(|| LoggerNode {
                metadata: Fields::new(),
                types: Arc::new(RwLock::new(self.base_types.clone())),
                sampler: Arc::new(Mutex::new(None)),
            });
            if !metadata.is_empty() {
                node.metadata = metadata;
            }
            (effective, Arc::clone(&node.types), Arc::clone(&node.sampler))
        };

        let logger = Logger::builder(self.logger_name(path))
            .level(self.levels.resolve(path))
            .metadata(effective.clone())
            .identity(Arc::clone(&self.identity))
            .shared_appender(Arc::clone(&self.appender))
            .metrics(Arc::clone(&self.metrics))
            .build()?;

        Ok(Monitor::new(
            path.to_string(),
            logger,
            effective,
            types,
            sampler,
            Arc::clone(self),
        ))
    }

    /// Terminate the process, unless mock mode forbids it
    pub fn exit(&self, status: i32) {
        if let Some(mock) = self.mock {
            if !mock.allow_exit {
                return;
            }
        }
        (self.exit_handler)(status);
    }

    pub(crate) fn track_sampler(&self, sampler: AbortHandle) {
        let mut samplers = self.samplers.lock();
        samplers.retain(|s| !s.is_finished());
        samplers.push(sampler);
    }

    pub(super) fn install_interceptor(&self, monitor: Monitor) {
        let mut interceptor = self.interceptor.lock();
        if let Some(previous) = interceptor.take() {
            previous.uninstall();
        }
        *interceptor = Some(CrashInterceptor::install(monitor));
    }

    pub fn is_intercepting(&self) -> bool {
        self.interceptor.lock().is_some()
    }

    /// A detached task failed and nobody was awaiting it
    pub(crate) fn unhandled_failure(&self, monitor: &Monitor, report: ErrorReport) {
        if !self.is_intercepting() {
            eprintln!(
                "[MONITOR WARNING] Unhandled failure in detached task: {}: {}",
                report.name, report.message
            );
            return;
        }

        monitor.report_error_with(report, LogLevel::Err, reason("unhandledRejection"));
        if self.bail_on_unhandled_rejection {
            if let Err(e) = monitor.flush() {
                eprintln!("[MONITOR ERROR] Flush before exit failed: {}", e);
            }
            self.exit(1);
        }
    }

    /// Stop samplers, remove crash interception and flush the appender
    pub(super) fn shutdown(&self) {
        for sampler in self.samplers.lock().drain(..) {
            sampler.abort();
        }
        if let Some(interceptor) = self.interceptor.lock().take() {
            interceptor.uninstall();
        }
        self.nodes.lock().clear();
        if let Err(e) = self.appender.lock().flush() {
            eprintln!("[MONITOR ERROR] Flush on shutdown failed: {}", e);
        }
    }
}

impl std::fmt::Debug for ProcessContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessContext")
            .field("project", &self.project)
            .field("identity", &self.identity)
            .field("levels", &self.levels)
            .field("verify", &self.verify)
            .field("mock", &self.mock)
            .finish_non_exhaustive()
    }
}

/// Strict ancestors of a dotted path, root first
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('.').map(move |(idx, _)| &path[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors() {
        let found: Vec<&str> = ancestors("root.api.handler").collect();
        assert_eq!(found, vec!["root", "root.api"]);
        assert_eq!(ancestors("root").count(), 0);
    }
}
