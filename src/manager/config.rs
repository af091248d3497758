//! Manager configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Mock mode settings: records are captured in memory instead of written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockConfig {
    /// Let `one_shot` and crash interception exit the process anyway
    #[serde(default)]
    pub allow_exit: bool,
}

/// Settings for [`MonitorManager::setup`](super::MonitorManager::setup)
///
/// Deserializes from camelCase keys; every key is optional.
///
/// ```
/// use rust_monitor_system::manager::MonitorConfig;
///
/// let config: MonitorConfig =
///     serde_json::from_str(r#"{"level": "root:info root.api:debug", "mock": {}}"#).unwrap();
/// assert!(config.mock.is_some());
/// assert!(!config.verify);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    /// A level name or `path:level` overrides
    #[serde(default = "default_level")]
    pub level: String,
    /// Human-readable colored lines instead of JSON
    #[serde(default)]
    pub pretty: bool,
    /// Check typed messages against their registration
    #[serde(default)]
    pub verify: bool,
    #[serde(default)]
    pub mock: Option<MockConfig>,
    /// Intercept panics and unhandled failures of detached tasks
    #[serde(default)]
    pub patch_global: bool,
    /// Exit when a detached task fails unhandled
    #[serde(default)]
    pub bail_on_unhandled_rejection: bool,
    /// Start resource sampling of the root facade under this label
    #[serde(default)]
    pub process_name: Option<String>,
    /// Resource sampling interval, in seconds
    #[serde(default = "default_resource_interval")]
    pub resource_interval: u64,
    /// Reported as `serviceContext.version`
    #[serde(default)]
    pub git_version: Option<String>,
    /// Append records to this file instead of stdout
    #[serde(default)]
    pub destination: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_resource_interval() -> u64 {
    60
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            pretty: false,
            verify: false,
            mock: None,
            patch_global: false,
            bail_on_unhandled_rejection: false,
            process_name: None,
            resource_interval: default_resource_interval(),
            git_version: None,
            destination: None,
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[must_use]
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    #[must_use]
    pub fn with_mock(mut self, mock: MockConfig) -> Self {
        self.mock = Some(mock);
        self
    }

    #[must_use]
    pub fn with_patch_global(mut self, patch_global: bool) -> Self {
        self.patch_global = patch_global;
        self
    }

    #[must_use]
    pub fn with_bail_on_unhandled_rejection(mut self, bail: bool) -> Self {
        self.bail_on_unhandled_rejection = bail;
        self
    }

    #[must_use]
    pub fn with_process_name(mut self, process_name: impl Into<String>) -> Self {
        self.process_name = Some(process_name.into());
        self
    }

    #[must_use]
    pub fn with_resource_interval(mut self, seconds: u64) -> Self {
        self.resource_interval = seconds;
        self
    }

    #[must_use]
    pub fn with_git_version(mut self, git_version: impl Into<String>) -> Self {
        self.git_version = Some(git_version.into());
        self
    }

    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn resource_interval(&self) -> Duration {
        Duration::from_secs(self.resource_interval)
    }
}
