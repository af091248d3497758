//! # Rust Monitor System
//!
//! Structured logging and metrics for services that share one process-tree
//! naming convention.
//!
//! ## Features
//!
//! - **Structured records**: one mozlog-style JSON object per line with a
//!   stable key order, or colored human-readable lines for local use
//! - **Typed messages**: named, versioned log types with required fields,
//!   checked when verification is enabled
//! - **Hierarchical loggers**: `root.api.handler` style paths with per-subtree
//!   levels and inherited metadata
//! - **Metrics and timers**: counts, measures, timed closures, futures,
//!   handlers, requests and external clients, plus periodic resource usage
//! - **Test capture**: mock mode collects every record in memory, in order
//! - **Crash interception**: panics and failed detached tasks are reported
//!   before the process exits

pub mod appenders;
pub mod core;
pub mod macros;
pub mod manager;
pub mod monitor;

pub mod prelude {
    pub use crate::appenders::{CaptureAppender, ConsoleAppender, FileAppender, MessageCapture};
    pub use crate::core::{
        Appender, Fields, LogLevel, LogRecord, Logger, LoggerBuilder, LoggerMetrics, MonitorError,
        OutputFormat, Result,
    };
    pub use crate::manager::{MockConfig, MonitorConfig, MonitorManager};
    pub use crate::monitor::{
        ErrorReport, ExternalClient, MessageType, Monitor, ResponseTimer, TimeKeeper, TimedClient,
    };
}

pub use appenders::{CaptureAppender, ConsoleAppender, FileAppender, MessageCapture};
pub use core::{
    Appender, Fields, LogLevel, LogRecord, Logger, LoggerBuilder, LoggerMetrics, MonitorError,
    OutputFormat, ProcessIdentity, Result, ServiceContext, GENERIC_TYPE, LOGGING_ERROR_TYPE,
};
pub use manager::{LevelSpec, MockConfig, MonitorConfig, MonitorManager, ProcessContext};
pub use monitor::{
    ErrorReport, ExternalClient, MessageLevel, MessageType, Monitor, Outcome, ResponseTimer,
    TimeKeeper, TimedClient,
};
