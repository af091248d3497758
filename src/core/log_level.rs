//! Syslog severity levels
//!
//! Eight levels, most urgent first. The numeric value is what lands in the
//! `Severity` field of every record, so lower means more urgent.

use super::error::MonitorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum LogLevel {
    Emerg = 0,
    Alert = 1,
    Crit = 2,
    Err = 3,
    Warning = 4,
    Notice = 5,
    #[default]
    Info = 6,
    Debug = 7,
}

impl LogLevel {
    /// All levels, most urgent first
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Emerg,
        LogLevel::Alert,
        LogLevel::Crit,
        LogLevel::Err,
        LogLevel::Warning,
        LogLevel::Notice,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    /// Configuration name, as accepted by `FromStr`
    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Emerg => "emerg",
            LogLevel::Alert => "alert",
            LogLevel::Crit => "crit",
            LogLevel::Err => "err",
            LogLevel::Warning => "warning",
            LogLevel::Notice => "notice",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// Label for severity-aware backends (the lowercase `severity` key)
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Emerg => "EMERGENCY",
            LogLevel::Alert => "ALERT",
            LogLevel::Crit => "CRITICAL",
            LogLevel::Err => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Notice => "NOTICE",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Whether a record at `level` passes a logger whose threshold is `self`
    #[inline]
    pub fn allows(&self, level: LogLevel) -> bool {
        level <= *self
    }

    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Emerg | LogLevel::Alert | LogLevel::Crit => BrightRed,
            LogLevel::Err => Red,
            LogLevel::Warning => Yellow,
            LogLevel::Notice => Blue,
            LogLevel::Info => Green,
            LogLevel::Debug => Magenta,
        }
    }

    /// Whether the pretty formatter renders this level in bold
    pub fn is_bold(&self) -> bool {
        matches!(self, LogLevel::Emerg | LogLevel::Alert | LogLevel::Crit)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, <Self as FromStr>::Err> {
        match s.trim().to_lowercase().as_str() {
            "emerg" => Ok(LogLevel::Emerg),
            "alert" => Ok(LogLevel::Alert),
            "crit" => Ok(LogLevel::Crit),
            "err" => Ok(LogLevel::Err),
            "warning" => Ok(LogLevel::Warning),
            "notice" => Ok(LogLevel::Notice),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(MonitorError::InvalidLevel(s.trim().to_string())),
        }
    }
}

impl From<LogLevel> for u8 {
    fn from(level: LogLevel) -> Self {
        level.ordinal()
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        LogLevel::from_ordinal(value).ok_or_else(|| format!("Invalid severity ordinal: {}", value))
    }
}
