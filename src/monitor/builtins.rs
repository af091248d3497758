//! Built-in message types
//!
//! These are emitted by the facade's own helpers. Each one has a field
//! struct tied to its descriptor at compile time through [`BuiltinMessage`],
//! so built-in emissions never go through runtime verification.

use super::message_type::MessageType;
use crate::core::LogLevel;
use serde::Serialize;
use serde_json::Value;

/// Schema version of every built-in type
pub const BUILTIN_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    BasicTimer,
    HandlerTimer,
    ResponseTimer,
    ClientTimer,
    ResourceMetrics,
    CountMetric,
    MeasureMetric,
    ErrorReport,
}

impl Builtin {
    pub const ALL: [Builtin; 8] = [
        Builtin::BasicTimer,
        Builtin::HandlerTimer,
        Builtin::ResponseTimer,
        Builtin::ClientTimer,
        Builtin::ResourceMetrics,
        Builtin::CountMetric,
        Builtin::MeasureMetric,
        Builtin::ErrorReport,
    ];

    pub fn descriptor(&self) -> MessageType {
        match self {
            Builtin::BasicTimer => MessageType::new("basicTimer", "monitor.timer")
                .title("Basic Timer")
                .description("The most basic timer: how long an operation took.")
                .field("key", "A key that should be unique to the logger prefix.")
                .field("duration", "The duration in ms of whatever was timed."),
            Builtin::HandlerTimer => MessageType::new("handlerTimer", "monitor.handlerTimer")
                .title("Handler Timer")
                .description("Time taken by a single-message handler, successful or not.")
                .field("name", "Name of the handler.")
                .field("status", "Either `success` or `error`.")
                .field("duration", "The duration in ms of the handler."),
            Builtin::ResponseTimer => MessageType::new("responseTimer", "monitor.responseTimer")
                .title("Response Timer")
                .description("Time from receiving a request until its response finished or its connection closed.")
                .field("name", "Name of the request handler.")
                .field("statusCode", "The response status code.")
                .field("duration", "The duration in ms of the request."),
            Builtin::ClientTimer => MessageType::new("clientTimer", "monitor.clientTimer")
                .title("External Client Timer")
                .description("Time taken by one call dispatched through an instrumented external client.")
                .field("service", "Identifier of the external service.")
                .field("operation", "The operation that was dispatched.")
                .field("duration", "The duration in ms of the call.")
                .field("region", "The region the client is configured for, if any."),
            Builtin::ResourceMetrics => MessageType::new("resourceMetrics", "monitor.resources")
                .title("Resource Metrics")
                .description("Periodic CPU and memory usage of the process.")
                .field("process", "The label the sampler was started with.")
                .field("lastCpuUsage", "Accumulated CPU time and the delta since the previous sample.")
                .field("lastMemoryUsage", "Resident and virtual memory, with the resident delta."),
            Builtin::CountMetric => MessageType::new("countMetric", "monitor.count")
                .title("Counter")
                .description("A counter to be summed over a time period.")
                .field("key", "The name of the counter.")
                .field("val", "The amount to add."),
            Builtin::MeasureMetric => MessageType::new("measureMetric", "monitor.measure")
                .title("Measure")
                .description("A measurement to take percentiles over.")
                .field("key", "The name of the measure.")
                .field("val", "The measured value."),
            Builtin::ErrorReport => MessageType::new("errorReport", "monitor.error")
                .any_level()
                .title("Error Report")
                .description("A serialized error, with any extra fields the reporter attached.")
                .field("name", "The error's type name.")
                .field("message", "The error's message.")
                .field("stack", "The captured stack trace."),
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Builtin::BasicTimer => "monitor.timer",
            Builtin::HandlerTimer => "monitor.handlerTimer",
            Builtin::ResponseTimer => "monitor.responseTimer",
            Builtin::ClientTimer => "monitor.clientTimer",
            Builtin::ResourceMetrics => "monitor.resources",
            Builtin::CountMetric => "monitor.count",
            Builtin::MeasureMetric => "monitor.measure",
            Builtin::ErrorReport => "monitor.error",
        }
    }

    /// Severity when the type is not `any`
    pub fn default_level(&self) -> LogLevel {
        match self {
            Builtin::ErrorReport => LogLevel::Err,
            _ => LogLevel::Info,
        }
    }
}

/// Field struct of a built-in type
pub trait BuiltinMessage: Serialize {
    const KIND: Builtin;
}

#[derive(Debug, Serialize)]
pub struct TimerFields<'a> {
    pub key: &'a str,
    pub duration: f64,
}

impl BuiltinMessage for TimerFields<'_> {
    const KIND: Builtin = Builtin::BasicTimer;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerStatus {
    Success,
    Error,
}

#[derive(Debug, Serialize)]
pub struct HandlerTimerFields<'a> {
    pub name: &'a str,
    pub status: HandlerStatus,
    pub duration: f64,
}

impl BuiltinMessage for HandlerTimerFields<'_> {
    const KIND: Builtin = Builtin::HandlerTimer;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTimerFields<'a> {
    pub name: &'a str,
    pub status_code: u16,
    pub duration: f64,
}

impl BuiltinMessage for ResponseTimerFields<'_> {
    const KIND: Builtin = Builtin::ResponseTimer;
}

#[derive(Debug, Serialize)]
pub struct ClientTimerFields<'a> {
    pub service: &'a str,
    pub operation: &'a str,
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<&'a str>,
}

impl BuiltinMessage for ClientTimerFields<'_> {
    const KIND: Builtin = Builtin::ClientTimer;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuUsage {
    /// CPU time consumed by the process since it started, in ms
    pub total_ms: u64,
    /// CPU time consumed since the previous sample, in ms
    pub delta_ms: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    /// Resident set size in bytes
    pub rss: u64,
    pub rss_delta: i64,
    pub virtual_memory: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFields<'a> {
    pub process: &'a str,
    pub last_cpu_usage: CpuUsage,
    pub last_memory_usage: MemoryUsage,
}

impl BuiltinMessage for ResourceFields<'_> {
    const KIND: Builtin = Builtin::ResourceMetrics;
}

#[derive(Debug, Serialize)]
pub struct CountFields<'a> {
    pub key: &'a str,
    pub val: &'a Value,
}

impl BuiltinMessage for CountFields<'_> {
    const KIND: Builtin = Builtin::CountMetric;
}

#[derive(Debug, Serialize)]
pub struct MeasureFields<'a> {
    pub key: &'a str,
    pub val: &'a Value,
}

impl BuiltinMessage for MeasureFields<'_> {
    const KIND: Builtin = Builtin::MeasureMetric;
}
