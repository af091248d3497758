//! Level configuration strings
//!
//! Either a single level name (`"info"`), applied to `root` and everything
//! below it, or whitespace-separated `path:level` overrides such as
//! `"root:info root.api:debug"`, in which `root` must appear.

use crate::core::{LogLevel, MonitorError, Result};
use std::collections::BTreeMap;
use std::str::FromStr;

pub const ROOT: &str = "root";

/// Parsed level configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSpec {
    root: LogLevel,
    overrides: BTreeMap<String, LogLevel>,
}

impl LevelSpec {
    pub fn uniform(level: LogLevel) -> Self {
        Self {
            root: level,
            overrides: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> LogLevel {
        self.root
    }

    /// Threshold of `path`: its own override, else the nearest ancestor's,
    /// else the root level
    pub fn resolve(&self, path: &str) -> LogLevel {
        let mut current = path;
        loop {
            if let Some(level) = self.overrides.get(current) {
                return *level;
            }
            match current.rfind('.') {
                Some(idx) => current = &current[..idx],
                None => return self.root,
            }
        }
    }
}

impl Default for LevelSpec {
    fn default() -> Self {
        Self::uniform(LogLevel::Info)
    }
}

impl FromStr for LevelSpec {
    type Err = MonitorError;

    fn from_str(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if !spec.contains(':') {
            return Ok(Self::uniform(spec.parse()?));
        }

        let mut root = None;
        let mut overrides = BTreeMap::new();
        for token in spec.split_whitespace() {
            let (path, level) = token.split_once(':').ok_or_else(|| {
                MonitorError::config("level", format!("expected `path:level`, got `{}`", token))
            })?;
            let level: LogLevel = level.parse()?;

            if path == ROOT {
                root = Some(level);
            } else if path.starts_with("root.") && !path.ends_with('.') {
                overrides.insert(path.to_string(), level);
            } else {
                return Err(MonitorError::config(
                    "level",
                    format!("override path `{}` must start with `root.`", path),
                ));
            }
        }

        let root = root.ok_or_else(|| {
            MonitorError::config("level", format!("must specify `root:` level in `{}`", spec))
        })?;
        Ok(Self { root, overrides })
    }
}
