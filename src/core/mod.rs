//! Core record types and the level-gated formatter

pub mod appender;
pub mod error;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod output_format;

pub use appender::Appender;
pub use error::{MonitorError, Result};
pub use log_level::LogLevel;
pub use log_record::{Fields, LogRecord, ServiceContext, ENV_VERSION};
pub use logger::{
    is_appending, Logger, LoggerBuilder, ProcessIdentity, SharedAppender, GENERIC_TYPE,
    LOGGING_ERROR_TYPE,
};
pub use metrics::LoggerMetrics;
pub use output_format::OutputFormat;
