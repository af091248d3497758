//! Error types for the monitor system

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Unknown severity name
    #[error("Error levels must correspond to syslog severity levels. '{0}' is invalid.")]
    InvalidLevel(String),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Facade name already taken by a registered type or a built-in member
    #[error("Cannot override \"{0}\" as custom message type")]
    DuplicateMessageType(String),

    /// Typed call to a name that was never registered
    #[error("No message type named \"{0}\" is registered")]
    UnknownMessageType(String),

    /// Required field absent under verification
    #[error("Log message \"{message_type}\" must include field \"{field}\"")]
    MissingField { message_type: String, field: String },

    /// Reserved field set by the caller under verification
    #[error("\"{field}\" is a reserved field for logging messages (in \"{message_type}\")")]
    ReservedField { message_type: String, field: String },

    /// Level `any` used without an explicit severity
    #[error("Must provide a level override for \"{0}\", its registered level is `any`")]
    MissingLevelOverride(String),

    /// Typed call whose fields are not a map
    #[error("Fields for \"{0}\" must be a map")]
    InvalidFields(String),

    /// Non-numeric count or measure
    #[error("{kind} values must be numbers (key \"{key}\")")]
    InvalidMetricValue { kind: String, key: String },

    /// Second unforced submission of a time keeper
    #[error("Cannot submit time keeper \"{key}\" twice")]
    AlreadySubmitted { key: String },

    /// Manager used before `setup`
    #[error("Monitor manager has not been set up")]
    NotSetUp,

    /// Manager `setup` called twice
    #[error("Monitor manager is already set up")]
    AlreadySetUp,

    /// IO error with context
    #[error("IO error while {operation}: {source}")]
    IoOperation {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl MonitorError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        MonitorError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an IO operation error with context
    pub fn io_operation(operation: impl Into<String>, source: std::io::Error) -> Self {
        MonitorError::IoOperation {
            operation: operation.into(),
            source,
        }
    }

    pub fn missing_field(message_type: impl Into<String>, field: impl Into<String>) -> Self {
        MonitorError::MissingField {
            message_type: message_type.into(),
            field: field.into(),
        }
    }

    pub fn reserved_field(message_type: impl Into<String>, field: impl Into<String>) -> Self {
        MonitorError::ReservedField {
            message_type: message_type.into(),
            field: field.into(),
        }
    }

    pub fn invalid_metric(kind: impl Into<String>, key: impl Into<String>) -> Self {
        MonitorError::InvalidMetricValue {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        MonitorError::Other(msg.into())
    }
}
