//! Typed message descriptors and their validation
//!
//! A message type binds a facade name (`createdTask`) to a wire tag
//! (`queue.createdTask`), a schema version, a severity and the set of fields
//! every emission must carry. Each logger path owns one table; all facades
//! for that path share it.

use super::builtins::Builtin;
use crate::core::{Fields, LogLevel, MonitorError, Result};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Fields callers may never set on a typed message
pub const RESERVED_FIELDS: [&str; 2] = ["v", "meta"];

/// Facade members that cannot be shadowed by a registered type
pub const RESERVED_MEMBERS: &[&str] = &[
    "emerg",
    "alert",
    "crit",
    "err",
    "warning",
    "notice",
    "info",
    "debug",
    "emit",
    "log",
    "register",
    "child",
    "timer",
    "timedHandler",
    "responseTimer",
    "timeKeeper",
    "instrumentClient",
    "oneShot",
    "resources",
    "stopResourceMonitoring",
    "count",
    "measure",
    "reportError",
    "spawnDetached",
];

/// Severity of a message type: fixed, or chosen per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Fixed(LogLevel),
    Any,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageLevel::Fixed(level) => write!(f, "{}", level),
            MessageLevel::Any => write!(f, "any"),
        }
    }
}

impl Serialize for MessageLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<LogLevel> for MessageLevel {
    fn from(level: LogLevel) -> Self {
        MessageLevel::Fixed(level)
    }
}

/// Registration metadata for one typed message
///
/// # Example
///
/// ```
/// use rust_monitor_system::{LogLevel, MessageType};
///
/// let created = MessageType::new("createdTask", "queue.createdTask")
///     .version(2)
///     .level(LogLevel::Notice)
///     .title("Task Created")
///     .field("taskId", "The new task's id");
/// assert_eq!(created.required_fields().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageType {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub version: u32,
    pub level: MessageLevel,
    pub title: String,
    pub description: String,
    /// Required field names mapped to their documentation
    pub fields: BTreeMap<String, String>,
}

impl MessageType {
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
            version: 1,
            level: MessageLevel::Fixed(LogLevel::Info),
            title: String::new(),
            description: String::new(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: impl Into<MessageLevel>) -> Self {
        self.level = level.into();
        self
    }

    /// Let each call choose the severity
    #[must_use = "builder methods return a new value"]
    pub fn any_level(mut self) -> Self {
        self.level = MessageLevel::Any;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a required field
    #[must_use = "builder methods return a new value"]
    pub fn field(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.fields.insert(name.into(), description.into());
        self
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_builtin(&self) -> bool {
        self.type_tag.starts_with("monitor.")
    }

    /// Validate one call and build the fields that will be logged
    ///
    /// Under `verify`, required fields, reserved fields and the level
    /// override for `any` types are checked. The schema version is always
    /// injected as `v`.
    pub fn prepare(
        &self,
        fields: Value,
        level: Option<LogLevel>,
        verify: bool,
    ) -> Result<(LogLevel, Value)> {
        if verify {
            self.verify(&fields, level)?;
        }

        let level = match self.level {
            MessageLevel::Fixed(level) => level,
            MessageLevel::Any => level.unwrap_or(LogLevel::Info),
        };

        let fields = match fields {
            Value::Object(provided) => {
                let mut versioned = Fields::new();
                versioned.insert("v".to_string(), Value::from(self.version));
                versioned.extend(provided);
                Value::Object(versioned)
            }
            other => other,
        };

        Ok((level, fields))
    }

    fn verify(&self, fields: &Value, level: Option<LogLevel>) -> Result<()> {
        if self.level == MessageLevel::Any && level.is_none() {
            return Err(MonitorError::MissingLevelOverride(self.name.clone()));
        }

        let provided = fields
            .as_object()
            .ok_or_else(|| MonitorError::InvalidFields(self.name.clone()))?;

        if let Some(reserved) = RESERVED_FIELDS.iter().find(|f| provided.contains_key(**f)) {
            return Err(MonitorError::reserved_field(&self.name, *reserved));
        }

        if let Some(missing) = self.required_fields().find(|f| !provided.contains_key(*f)) {
            return Err(MonitorError::missing_field(&self.name, missing));
        }

        Ok(())
    }
}

/// Name-keyed table of message types
#[derive(Debug, Clone, Default)]
pub struct MessageTypeTable {
    types: BTreeMap<String, MessageType>,
}

impl MessageTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table preloaded with every built-in type
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        for builtin in Builtin::ALL {
            let descriptor = builtin.descriptor();
            table.types.insert(descriptor.name.clone(), descriptor);
        }
        table
    }

    /// Add a type; its name must not collide with a registered type or a
    /// facade member
    pub fn register(&mut self, message_type: MessageType) -> Result<()> {
        let name = message_type.name.as_str();
        if name.is_empty() {
            return Err(MonitorError::config("MessageType", "name must not be empty"));
        }
        if RESERVED_MEMBERS.contains(&name) || self.types.contains_key(name) {
            return Err(MonitorError::DuplicateMessageType(name.to_string()));
        }
        self.types.insert(name.to_string(), message_type);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MessageType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageType> {
        self.types.values()
    }
}
