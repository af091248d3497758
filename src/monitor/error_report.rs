//! Canonical error shape for `monitor.error` records

use super::builtins::{Builtin, BuiltinMessage};
use crate::core::log_record::display_value;
use crate::core::{Fields, MonitorError};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt::Write as _;

/// A normalized error: name, message and a stack
///
/// Anything convertible into an `ErrorReport` can be passed to
/// [`Monitor::report_error`](super::Monitor::report_error). Values without a
/// message or a stack are wrapped into a generic `Error` carrying the value
/// as its message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub name: String,
    pub message: String,
    pub stack: String,
    #[serde(flatten)]
    pub extra: Fields,
}

impl ErrorReport {
    /// Build a report, capturing the current stack
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let message = message.into();
        let stack = format!("{}: {}\n{}", name, message, Backtrace::force_capture());
        Self {
            name,
            message,
            stack,
            extra: Fields::new(),
        }
    }

    /// Report a typed error, named after its type, with its source chain
    pub fn from_error<E: std::error::Error>(error: &E) -> Self {
        let mut report = Self::new(short_type_name(std::any::type_name::<E>()), error.to_string());
        report.append_sources(error.source());
        report
    }

    /// Report a boxed error whose concrete type is unknown
    pub fn from_dyn_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut report = Self::new("Error", error.to_string());
        report.append_sources(error.source());
        report
    }

    /// Report a panic payload as returned by `catch_unwind`
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::new("Panic", panic_message(payload))
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    fn append_sources(&mut self, mut source: Option<&(dyn std::error::Error + 'static)>) {
        while let Some(cause) = source {
            let _ = write!(self.stack, "\nCaused by: {}", cause);
            source = cause.source();
        }
    }
}

impl BuiltinMessage for ErrorReport {
    const KIND: Builtin = Builtin::ErrorReport;
}

/// Text of a panic payload, for the common `&str`/`String` payloads
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// `core::num::ParseIntError` -> `ParseIntError`
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl From<&str> for ErrorReport {
    fn from(message: &str) -> Self {
        ErrorReport::new("Error", message)
    }
}

impl From<String> for ErrorReport {
    fn from(message: String) -> Self {
        ErrorReport::new("Error", message)
    }
}

impl From<MonitorError> for ErrorReport {
    fn from(error: MonitorError) -> Self {
        ErrorReport::from_error(&error)
    }
}

impl From<std::io::Error> for ErrorReport {
    fn from(error: std::io::Error) -> Self {
        ErrorReport::from_error(&error)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for ErrorReport {
    fn from(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        ErrorReport::from_dyn_error(error.as_ref())
    }
}

impl From<Value> for ErrorReport {
    fn from(value: Value) -> Self {
        let mut fields = match value {
            Value::Object(map) if map.contains_key("message") || map.contains_key("stack") => map,
            other => return ErrorReport::new("Error", display_value(&other)),
        };

        let name = match fields.remove("name") {
            Some(Value::String(name)) => name,
            _ => "Error".to_string(),
        };
        let message = fields
            .remove("message")
            .map(|m| display_value(&m))
            .unwrap_or_default();
        let mut report = ErrorReport::new(name, message);
        if let Some(stack) = fields.remove("stack") {
            report.stack = display_value(&stack);
        }
        report.extra = fields;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_is_generic_error() {
        let report = ErrorReport::from("oh no");
        assert_eq!(report.name, "Error");
        assert_eq!(report.message, "oh no");
        assert!(report.stack.starts_with("Error: oh no"));
    }

    #[test]
    fn test_typed_error_name() {
        let err = "x".parse::<u32>().unwrap_err();
        let report = ErrorReport::from_error(&err);
        assert_eq!(report.name, "ParseIntError");
        assert_eq!(report.message, err.to_string());

        let report = ErrorReport::from(MonitorError::NotSetUp);
        assert_eq!(report.name, "MonitorError");
    }

    #[test]
    fn test_source_chain_in_stack() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = MonitorError::io_operation("opening destination", io);
        let report = ErrorReport::from(err);
        assert!(report.stack.contains("Caused by: gone"));
    }

    #[test]
    fn test_value_without_message_is_wrapped() {
        let report = ErrorReport::from(json!({"code": 7}));
        assert_eq!(report.name, "Error");
        assert_eq!(report.message, r#"{"code":7}"#);
        assert!(report.extra.is_empty());
    }

    #[test]
    fn test_value_with_message_keeps_shape() {
        let report = ErrorReport::from(json!({
            "name": "TypeError",
            "message": "bad",
            "stack": "TypeError: bad\n    at here",
            "code": 7,
        }));
        assert_eq!(report.name, "TypeError");
        assert_eq!(report.stack, "TypeError: bad\n    at here");
        assert_eq!(report.extra["code"], json!(7));
    }

    #[test]
    fn test_panic_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(ErrorReport::from_panic(payload.as_ref()).message, "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(ErrorReport::from_panic(payload.as_ref()).message, "owned");
        let payload: Box<dyn Any + Send> = Box::new(5);
        assert_eq!(ErrorReport::from_panic(payload.as_ref()).name, "Panic");
    }

    #[test]
    fn test_extra_flattened() {
        let report = ErrorReport::from("boom").with_extra("reason", "Unhandled Rejection");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["reason"], "Unhandled Rejection");
        assert_eq!(value["message"], "boom");
    }
}
