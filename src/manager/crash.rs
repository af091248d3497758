//! Process-level crash interception
//!
//! While installed, a panic anywhere in the process is reported through the
//! root facade as a `monitor.error` record, the previous hook runs, and the
//! process exits with status 1 (subject to the context's mock settings).
//! Panics inside timing helpers are resumed in their caller and left alone.

use crate::core::{is_appending, Fields, LogLevel};
use crate::monitor::error_report::panic_message;
use crate::monitor::timer::is_observing;
use crate::monitor::{ErrorReport, Monitor};
use parking_lot::Mutex;
use serde_json::Value;
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;

type BoxedHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Handle to an installed panic hook
pub struct CrashInterceptor {
    previous: Arc<Mutex<Option<BoxedHook>>>,
}

impl CrashInterceptor {
    pub fn install(monitor: Monitor) -> Self {
        let previous = Arc::new(Mutex::new(Some(panic::take_hook())));
        let chained = Arc::clone(&previous);

        panic::set_hook(Box::new(move |info| {
            // the appender lock is held by this thread, or a timing helper
            // will hand the panic back to its caller
            let handled = is_appending() || is_observing();
            if !handled {
                monitor.report_error_with(panic_report(info), LogLevel::Err, reason("uncaughtException"));
                if let Err(e) = monitor.flush() {
                    eprintln!("[MONITOR ERROR] Flush after panic failed: {}", e);
                }
            }
            if let Some(hook) = chained.lock().as_ref() {
                hook(info);
            }
            if !handled {
                monitor.context().exit(1);
            }
        }));

        Self { previous }
    }

    /// Restore the hook that was active before [`CrashInterceptor::install`]
    ///
    /// Does nothing on a panicking thread, where the hook cannot be changed.
    pub fn uninstall(self) {
        if std::thread::panicking() {
            return;
        }
        if let Some(previous) = self.previous.lock().take() {
            panic::set_hook(previous);
        }
    }
}

impl std::fmt::Debug for CrashInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrashInterceptor").finish_non_exhaustive()
    }
}

pub(crate) fn reason(reason: &str) -> Fields {
    let mut extra = Fields::new();
    extra.insert("reason".to_string(), Value::from(reason));
    extra
}

fn panic_report(info: &PanicHookInfo<'_>) -> ErrorReport {
    let report = ErrorReport::new("Panic", panic_message(info.payload()));
    match info.location() {
        Some(location) => report.with_extra("location", location.to_string()),
        None => report,
    }
}
