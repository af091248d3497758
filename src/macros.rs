//! Formatting macros for ad-hoc messages
//!
//! Each macro formats its arguments like `format!` and emits the result as a
//! `monitor.generic` record through a [`Monitor`](crate::Monitor).
//!
//! # Examples
//!
//! ```
//! use rust_monitor_system::prelude::*;
//! use rust_monitor_system::{info, warning};
//!
//! let mut manager = MonitorManager::new("svc");
//! manager.setup(MonitorConfig::default().with_mock(MockConfig::default())).unwrap();
//! let monitor = manager.root_monitor().unwrap();
//!
//! info!(monitor, "Server started");
//! let port = 8080;
//! warning!(monitor, "Port {} already bound, retrying", port);
//!
//! assert_eq!(manager.messages()[1].message.as_deref(), Some("Port 8080 already bound, retrying"));
//! ```

/// Emit a formatted message at `level`.
///
/// # Examples
///
/// ```
/// # use rust_monitor_system::prelude::*;
/// # let mut manager = MonitorManager::new("svc");
/// # manager.setup(MonitorConfig::default().with_mock(MockConfig::default())).unwrap();
/// # let monitor = manager.root_monitor().unwrap();
/// use rust_monitor_system::log;
/// log!(monitor, LogLevel::Notice, "Simple message");
/// log!(monitor, LogLevel::Err, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($monitor:expr, $level:expr, $($arg:tt)+) => {
        $monitor.generic($level, format!($($arg)+))
    };
}

#[macro_export]
macro_rules! emerg {
    ($monitor:expr, $($arg:tt)+) => {
        $crate::log!($monitor, $crate::LogLevel::Emerg, $($arg)+)
    };
}

#[macro_export]
macro_rules! alert {
    ($monitor:expr, $($arg:tt)+) => {
        $crate::log!($monitor, $crate::LogLevel::Alert, $($arg)+)
    };
}

#[macro_export]
macro_rules! crit {
    ($monitor:expr, $($arg:tt)+) => {
        $crate::log!($monitor, $crate::LogLevel::Crit, $($arg)+)
    };
}

/// Emit a formatted `err` message.
///
/// # Examples
///
/// ```
/// # use rust_monitor_system::prelude::*;
/// # let mut manager = MonitorManager::new("svc");
/// # manager.setup(MonitorConfig::default().with_mock(MockConfig::default())).unwrap();
/// # let monitor = manager.root_monitor().unwrap();
/// use rust_monitor_system::err;
/// err!(monitor, "Failed to connect to {}", "db.internal");
/// ```
#[macro_export]
macro_rules! err {
    ($monitor:expr, $($arg:tt)+) => {
        $crate::log!($monitor, $crate::LogLevel::Err, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($monitor:expr, $($arg:tt)+) => {
        $crate::log!($monitor, $crate::LogLevel::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! notice {
    ($monitor:expr, $($arg:tt)+) => {
        $crate::log!($monitor, $crate::LogLevel::Notice, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($monitor:expr, $($arg:tt)+) => {
        $crate::log!($monitor, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Emit a formatted `debug` message; suppressed unless the facade's level
/// allows it.
#[macro_export]
macro_rules! debug {
    ($monitor:expr, $($arg:tt)+) => {
        $crate::log!($monitor, $crate::LogLevel::Debug, $($arg)+)
    };
}
