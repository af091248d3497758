//! Appender implementations

pub mod capture;
pub mod console;
pub mod file;

pub use capture::{CaptureAppender, MessageCapture};
pub use console::ConsoleAppender;
pub use file::FileAppender;

// Re-export trait for convenience
pub use crate::core::Appender;
