//! Timing helpers
//!
//! Every helper here is a transparent wrapper: the wrapped work's result,
//! error or panic reaches the caller unchanged, after the duration has been
//! recorded.

use super::builtins::{HandlerStatus, HandlerTimerFields, ResponseTimerFields, TimerFields};
use super::Monitor;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::cell::Cell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

thread_local! {
    static OBSERVING: Cell<usize> = const { Cell::new(0) };
}

/// True while this thread runs work whose panic is caught by an [`Outcome`]
///
/// Such a panic is handed back to the caller, so the crash hook leaves it
/// alone.
pub fn is_observing() -> bool {
    OBSERVING.with(Cell::get) > 0
}

struct ObserveDepth;

impl ObserveDepth {
    fn enter() -> Self {
        OBSERVING.with(|depth| depth.set(depth.get() + 1));
        ObserveDepth
    }
}

impl Drop for ObserveDepth {
    fn drop(&mut self) {
        OBSERVING.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// How a piece of observed work ended
///
/// Observing never changes the outcome: [`Outcome::forward`] returns the
/// value or resumes the original panic.
pub enum Outcome<T> {
    Completed(T),
    Panicked(Box<dyn Any + Send + 'static>),
}

impl<T> Outcome<T> {
    pub fn observe<F: FnOnce() -> T>(work: F) -> Self {
        let result = {
            let _depth = ObserveDepth::enter();
            panic::catch_unwind(AssertUnwindSafe(work))
        };
        match result {
            Ok(value) => Outcome::Completed(value),
            Err(payload) => Outcome::Panicked(payload),
        }
    }

    pub async fn observe_future<F: Future<Output = T>>(future: F) -> Self {
        let mut future = std::pin::pin!(future);
        // the task may move between threads, so the depth is held per poll
        let observed = futures::future::poll_fn(|cx| {
            let _depth = ObserveDepth::enter();
            future.as_mut().poll(cx)
        });
        match AssertUnwindSafe(observed).catch_unwind().await {
            Ok(value) => Outcome::Completed(value),
            Err(payload) => Outcome::Panicked(payload),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    /// Hand the outcome back to the caller as if it was never observed
    pub fn forward(self) -> T {
        match self {
            Outcome::Completed(value) => value,
            Outcome::Panicked(payload) => panic::resume_unwind(payload),
        }
    }
}

pub(crate) fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

impl Monitor {
    /// Time a closure, recording a `monitor.timer` record under `key`
    ///
    /// A panic in `work` is resumed in the caller after recording. It is
    /// not reported by crash interception while passing through the timer;
    /// catching or propagating it is the caller's decision.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_monitor_system::prelude::*;
    ///
    /// let mut manager = MonitorManager::new("svc");
    /// manager.setup(MonitorConfig::default().with_mock(MockConfig::default())).unwrap();
    /// let monitor = manager.root_monitor().unwrap();
    ///
    /// assert_eq!(monitor.timer("k", || 13), 13);
    /// assert_eq!(manager.messages()[0].type_tag, "monitor.timer");
    /// ```
    pub fn timer<T>(&self, key: &str, work: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let outcome = Outcome::observe(work);
        self.record_timer(key, start.elapsed());
        outcome.forward()
    }

    /// Time a future until it resolves
    ///
    /// An already-available value can be timed with `std::future::ready`.
    pub async fn timer_async<F: Future>(&self, key: &str, future: F) -> F::Output {
        let start = Instant::now();
        let outcome = Outcome::observe_future(future).await;
        self.record_timer(key, start.elapsed());
        outcome.forward()
    }

    fn record_timer(&self, key: &str, elapsed: Duration) {
        self.emit_builtin(
            &TimerFields {
                key,
                duration: millis(elapsed),
            },
            None,
        );
    }

    /// Wrap a single-argument async handler so each call records a
    /// `monitor.handlerTimer` with its status
    pub fn timed_handler<A, T, E, H, Fut>(
        &self,
        name: impl Into<String>,
        handler: H,
    ) -> impl Fn(A) -> BoxFuture<'static, Result<T, E>> + Clone + Send + Sync
    where
        H: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let handler = Arc::new(handler);
        let name: Arc<str> = Arc::from(name.into());
        let monitor = self.clone();

        move |arg: A| {
            let future = (*handler)(arg);
            let monitor = monitor.clone();
            let name = Arc::clone(&name);
            async move {
                let start = Instant::now();
                let outcome = Outcome::observe_future(future).await;
                let status = match &outcome {
                    Outcome::Completed(Ok(_)) => HandlerStatus::Success,
                    _ => HandlerStatus::Error,
                };
                monitor.emit_builtin(
                    &HandlerTimerFields {
                        name: &name,
                        status,
                        duration: millis(start.elapsed()),
                    },
                    None,
                );
                outcome.forward()
            }
            .boxed()
        }
    }

    /// Start timing one request; see [`ResponseTimer`]
    pub fn response_timer(&self, name: impl Into<String>) -> ResponseTimer {
        ResponseTimer {
            inner: Arc::new(ResponseTimerInner {
                monitor: self.clone(),
                name: name.into(),
                start: Instant::now(),
                recorded: AtomicBool::new(false),
            }),
        }
    }
}

/// Times one request from arrival until its response finishes or its
/// connection closes, whichever is signalled first
///
/// Clones share state, so the finish and close paths of a server can each
/// hold one. Only the first signal records a `monitor.responseTimer`.
#[derive(Clone)]
pub struct ResponseTimer {
    inner: Arc<ResponseTimerInner>,
}

struct ResponseTimerInner {
    monitor: Monitor,
    name: String,
    start: Instant,
    recorded: AtomicBool,
}

impl ResponseTimer {
    /// The response was fully written; returns whether this call recorded
    pub fn finish(&self, status_code: u16) -> bool {
        self.record(status_code)
    }

    /// The connection closed; returns whether this call recorded
    pub fn close(&self, status_code: u16) -> bool {
        self.record(status_code)
    }

    pub fn is_recorded(&self) -> bool {
        self.inner.recorded.load(Ordering::Acquire)
    }

    fn record(&self, status_code: u16) -> bool {
        if self.inner.recorded.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.monitor.emit_builtin(
            &ResponseTimerFields {
                name: &self.inner.name,
                status_code,
                duration: millis(self.inner.start.elapsed()),
            },
            None,
        );
        true
    }
}

impl std::fmt::Debug for ResponseTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseTimer")
            .field("name", &self.inner.name)
            .field("recorded", &self.is_recorded())
            .finish()
    }
}
