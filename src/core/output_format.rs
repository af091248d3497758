//! Output format configuration for log records
//!
//! Provides the two output modes a logger can be built with:
//! - Structured: canonical single-line JSON envelope (default)
//! - Pretty: colorized human-readable line for local development

use super::log_record::{display_value, LogRecord};
use chrono::{DateTime, Utc};
use colored::Colorize;

/// Output format for log records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Canonical JSON envelope, keys sorted at every depth
    ///
    /// Example: `{"EnvVersion":"2.0","Fields":{"key":"k"},...,"severity":"INFO"}`
    #[default]
    Structured,

    /// Colorized text with a key/value trailer
    ///
    /// Example: `2025-01-08T10:30:45.123Z INFO (monitor.timer): ` followed by
    /// one `\n\tkey: value` line per field
    Pretty,
}

impl OutputFormat {
    pub fn from_pretty(pretty: bool) -> Self {
        if pretty {
            OutputFormat::Pretty
        } else {
            OutputFormat::Structured
        }
    }

    /// Format a record as one line, including the trailing newline
    pub fn format(&self, record: &LogRecord, use_colors: bool) -> String {
        match self {
            OutputFormat::Structured => self.format_structured(record),
            OutputFormat::Pretty => self.format_pretty(record, use_colors),
        }
    }

    fn format_structured(&self, record: &LogRecord) -> String {
        match record.to_canonical_json() {
            Ok(json) => format!("{}\n", json),
            Err(e) => {
                eprintln!("[MONITOR ERROR] Failed to serialize record: {}", e);
                String::new()
            }
        }
    }

    fn format_pretty(&self, record: &LogRecord, use_colors: bool) -> String {
        let timestamp = DateTime::<Utc>::from_timestamp_millis(record.timestamp / 1_000_000)
            .unwrap_or_default()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ");

        let message = record
            .message
            .as_deref()
            .map(escape_newlines)
            .unwrap_or_default();

        let extra: String = record
            .fields
            .iter()
            .filter(|(key, _)| key.as_str() != "msg")
            .map(|(key, value)| format!("\n\t{}: {}", key, escape_newlines(&display_value(value))))
            .collect();

        let level = record.severity.label();
        if use_colors {
            let mut level = level.color(record.severity.color_code());
            if record.severity.is_bold() {
                level = level.bold();
            }
            format!(
                "{} {} ({}): {}{}\n",
                timestamp,
                level,
                record.type_tag,
                message.blue(),
                extra.bright_black()
            )
        } else {
            format!(
                "{} {} ({}): {}{}\n",
                timestamp, level, record.type_tag, message, extra
            )
        }
    }
}

fn escape_newlines(s: &str) -> String {
    s.replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_record::{Fields, ServiceContext, ENV_VERSION};
    use crate::core::LogLevel;
    use serde_json::json;

    fn record(fields: Fields, message: Option<&str>) -> LogRecord {
        LogRecord {
            timestamp: 1_736_332_245_123 * 1_000_000,
            type_tag: "monitor.timer".into(),
            logger: "svc.root".into(),
            hostname: "host".into(),
            env_version: ENV_VERSION.into(),
            severity: LogLevel::Warning,
            pid: 7,
            fields,
            message: message.map(String::from),
            severity_name: LogLevel::Warning.label().into(),
            service_context: ServiceContext::default(),
        }
    }

    #[test]
    fn test_structured_is_single_json_line() {
        let mut fields = Fields::new();
        fields.insert("key".into(), json!("k"));
        let line = OutputFormat::Structured.format(&record(fields, None), false);

        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["Severity"], 4);
        assert_eq!(parsed["severity"], "WARNING");
        assert_eq!(parsed["Fields"]["key"], "k");
        assert!(parsed.get("message").is_none());
    }

    #[test]
    fn test_pretty_escapes_newlines() {
        let mut fields = Fields::new();
        fields.insert("message".into(), json!("line one\nline two"));
        fields.insert("count".into(), json!(3));
        let line = OutputFormat::Pretty.format(
            &record(fields, Some("line one\nline two")),
            false,
        );

        assert!(line.starts_with("2025-01-08T10:30:45.123Z WARNING (monitor.timer): line one\\nline two"));
        assert!(line.contains("\n\tcount: 3"));
        assert!(line.contains("\n\tmessage: line one\\nline two"));
    }

    #[test]
    fn test_pretty_without_message() {
        let line = OutputFormat::Pretty.format(&record(Fields::new(), None), false);
        assert_eq!(line, "2025-01-08T10:30:45.123Z WARNING (monitor.timer): \n");
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Structured);
        assert_eq!(OutputFormat::from_pretty(true), OutputFormat::Pretty);
    }
}
