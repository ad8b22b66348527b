//! Engine configuration.
//!
//! Search order:
//! 1. Explicit path (`--config`)
//! 2. `gradebook.config.json` in the working directory
//! 3. Built-in defaults
//!
//! All fields are optional.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::attendance::AttendanceConvention;
use crate::suggestions::CategoryKeywords;

pub const DEFAULT_CONFIG_FILE: &str = "gradebook.config.json";

const DEFAULT_FOCUS_THRESHOLD: f64 = 75.0;

fn default_focus_threshold() -> f64 {
    DEFAULT_FOCUS_THRESHOLD
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub category_keywords: CategoryKeywords,

    #[serde(default)]
    pub attendance_convention: AttendanceConvention,

    /// Category average (percent) below which a focus-area suggestion fires.
    #[serde(default = "default_focus_threshold")]
    pub focus_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            category_keywords: CategoryKeywords::default(),
            attendance_convention: AttendanceConvention::default(),
            focus_threshold: DEFAULT_FOCUS_THRESHOLD,
        }
    }
}

impl EngineConfig {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=100.0).contains(&self.focus_threshold) {
            anyhow::bail!(
                "focus_threshold must be between 0 and 100, got {}",
                self.focus_threshold
            );
        }
        if self.category_keywords.fallback.trim().is_empty() {
            anyhow::bail!("category_keywords.fallback must not be empty");
        }
        Ok(())
    }

    /// Resolves the config following the documented search order.
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        let candidate: PathBuf = working_dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading config");
            return Self::from_path(&candidate);
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.attendance_convention, AttendanceConvention::PresentAndExcused);
    }

    #[test]
    fn overrides_are_applied() {
        let config = EngineConfig::from_json(
            r#"{
                "attendance_convention": "present_only",
                "focus_threshold": 80,
                "category_keywords": {
                    "rules": [{"category": "Labs", "keywords": ["lab"]}],
                    "fallback": "General"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.attendance_convention, AttendanceConvention::PresentOnly);
        assert_eq!(config.focus_threshold, 80.0);
        assert_eq!(config.category_keywords.categorize("Lab 1"), "Labs");
    }

    #[test]
    fn rejects_unknown_fields_and_bad_thresholds() {
        assert!(EngineConfig::from_json(r#"{"colour": "red"}"#).is_err());
        assert!(EngineConfig::from_json(r#"{"focus_threshold": 140}"#).is_err());
    }

    #[test]
    fn missing_default_file_falls_back() {
        let dir = std::env::temp_dir().join(format!("gradebook-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = EngineConfig::load(None, &dir).unwrap();
        assert_eq!(config, EngineConfig::default());

        std::fs::write(dir.join(DEFAULT_CONFIG_FILE), r#"{"focus_threshold": 70}"#).unwrap();
        let config = EngineConfig::load(None, &dir).unwrap();
        assert_eq!(config.focus_threshold, 70.0);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
