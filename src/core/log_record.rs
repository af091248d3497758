//! The record envelope
//!
//! One `LogRecord` is produced per emitted log call. Its serialized form is the
//! mozlog envelope (`Timestamp`, `Type`, `Logger`, ...) extended with the
//! lowercase `severity` and `serviceContext` keys understood by
//! severity-aware backends.

use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field map carried by a record
pub type Fields = Map<String, Value>;

/// Fixed envelope version
pub const ENV_VERSION: &str = "2.0";

/// Static per-process service identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceContext {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Epoch milliseconds scaled by 1,000,000
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    #[serde(rename = "Type")]
    pub type_tag: String,
    #[serde(rename = "Logger")]
    pub logger: String,
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "EnvVersion")]
    pub env_version: String,
    #[serde(rename = "Severity")]
    pub severity: LogLevel,
    #[serde(rename = "Pid")]
    pub pid: u32,
    #[serde(rename = "Fields")]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "severity")]
    pub severity_name: String,
    #[serde(rename = "serviceContext")]
    pub service_context: ServiceContext,
}

impl LogRecord {
    /// Look up a field by name
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The reserved metadata map, if the emitting logger carried any
    pub fn meta(&self) -> Option<&Fields> {
        self.fields.get("meta").and_then(Value::as_object)
    }

    /// Serialize with lexicographically sorted keys at every depth
    pub fn to_canonical_json(&self) -> serde_json::Result<String> {
        let value = serde_json::to_value(self)?;
        serde_json::to_string(&canonicalize(value))
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Rebuild every object with its keys in sorted order
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Render a field value the way the message and pretty trailer show it
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
