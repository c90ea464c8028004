//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Timetable defaults (range length, overflow reporting)
//! - Default subject color
//! - Log level
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};

/// Upper bound for `timetable.default_range_days`.
pub const MAX_RANGE_DAYS: u32 = 366;

/// Timetable generation defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimetableConfig {
    /// Days covered by `timetable generate` when no end date is given.
    #[serde(default = "default_range_days")]
    pub default_range_days: u32,
    /// Surface hours that did not fit in the range.
    #[serde(default = "default_true")]
    pub report_overflow: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubjectsConfig {
    #[serde(default = "default_subject_color")]
    pub default_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `STUDYPLAN_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub timetable: TimetableConfig,
    #[serde(default)]
    pub subjects: SubjectsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_range_days() -> u32 {
    7
}
fn default_true() -> bool {
    true
}
fn default_subject_color() -> String {
    "#3B82F6".into()
}
fn default_log_level() -> String {
    "warn".into()
}

impl Default for TimetableConfig {
    fn default() -> Self {
        Self {
            default_range_days: default_range_days(),
            report_overflow: true,
        }
    }
}

impl Default for SubjectsConfig {
    fn default() -> Self {
        Self {
            default_color: default_subject_color(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if part.is_empty() {
                return Err(ConfigError::UnknownKey(key.to_string()));
            }
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => value
                        .parse::<bool>()
                        .map(serde_json::Value::Bool)
                        .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) => {
                        return Err(invalid("cannot overwrite a whole section".to_string()))
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Reject values that parse but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_RANGE_DAYS).contains(&self.timetable.default_range_days) {
            return Err(ConfigError::InvalidValue {
                key: "timetable.default_range_days".to_string(),
                message: format!("must be between 1 and {MAX_RANGE_DAYS}"),
            });
        }
        if !self.subjects.default_color.starts_with('#') {
            return Err(ConfigError::InvalidValue {
                key: "subjects.default_color".to_string(),
                message: "must be a hex color such as #3B82F6".to_string(),
            });
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(CoreError::Io(e)),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field. `self` is left unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.timetable.default_range_days, 7);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[timetable]\nreport_overflow = false\n").unwrap();
        assert!(!parsed.timetable.report_overflow);
        assert_eq!(parsed.timetable.default_range_days, 7);
        assert_eq!(parsed.subjects.default_color, "#3B82F6");
        assert_eq!(parsed.logging.level, "warn");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timetable.default_range_days").as_deref(), Some("7"));
        assert_eq!(cfg.get("timetable.report_overflow").as_deref(), Some("true"));
        assert_eq!(cfg.get("subjects.default_color").as_deref(), Some("#3B82F6"));
        assert!(cfg.get("timetable.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("timetable.default_range_days", "14").unwrap();
        cfg.set("timetable.report_overflow", "false").unwrap();
        cfg.set("logging.level", "studyplan_core=debug").unwrap();

        assert_eq!(cfg.timetable.default_range_days, 14);
        assert!(!cfg.timetable.report_overflow);
        assert_eq!(cfg.logging.level, "studyplan_core=debug");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("timetable.nonexistent", "1").unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::UnknownKey(_))));
        assert!(cfg.set("timetable..default_range_days", "1").is_err());
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("timetable.report_overflow", "not_a_bool").is_err());
        assert!(cfg.set("timetable.default_range_days", "-3").is_err());
        assert!(cfg.set("timetable", "1").is_err());
    }

    #[test]
    fn set_rejects_values_failing_validation() {
        let mut cfg = Config::default();
        assert!(cfg.set("timetable.default_range_days", "0").is_err());
        assert!(cfg.set("timetable.default_range_days", "367").is_err());
        assert!(cfg.set("timetable.default_range_days", "4000000000").is_err());
        assert!(cfg.set("subjects.default_color", "blue").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn range_days_upper_bound_is_accepted() {
        let mut cfg = Config::default();
        cfg.set("timetable.default_range_days", "366").unwrap();
        assert_eq!(cfg.timetable.default_range_days, MAX_RANGE_DAYS);
    }

    #[test]
    fn load_from_rejects_oversized_range() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timetable]\ndefault_range_days = 400\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();

        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.set("subjects.default_color", "#FF5733").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.subjects.default_color, "#FF5733");
    }

    #[test]
    fn load_from_malformed_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timetable = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::LoadFailed { .. })));
    }
}
