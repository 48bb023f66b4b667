//! TOML-based application settings.
//!
//! Stores the persisted subset of scheduler state:
//! - Location fetch interval and timeout
//! - High-accuracy flag for the provider
//! - The two feature toggles (fetch loop, stationary notifications)
//!
//! The notification re-fire interval is deliberately absent: it is
//! session-scoped and resets to its default on every start.
//!
//! Settings are stored at `~/.config/waylog/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

/// Application settings.
///
/// Typed store with explicit load-on-init and save-on-write semantics.
/// Serialized to/from TOML at `~/.config/waylog/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Milliseconds between location fetches.
    #[serde(default = "default_fetch_interval_ms")]
    pub fetch_interval_ms: u64,
    /// Timeout applied to each single fetch call.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub high_accuracy: bool,
    /// Feature toggle for the fetch loop.
    #[serde(default = "default_true")]
    pub fetch_enabled: bool,
    /// Feature toggle for stationary notifications.
    #[serde(default = "default_true")]
    pub notify_enabled: bool,
}

fn default_fetch_interval_ms() -> u64 {
    crate::scheduler::DEFAULT_FETCH_INTERVAL_MS
}
fn default_fetch_timeout_ms() -> u64 {
    15_000
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fetch_interval_ms: default_fetch_interval_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            high_accuracy: true,
            fetch_enabled: true,
            notify_enabled: true,
        }
    }
}

impl Settings {
    /// Callers map the error to the `ConfigError` variant matching the
    /// operation they are performing.
    fn path() -> Result<PathBuf, std::io::Error> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be parsed,
    /// or if the default settings cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config"),
            message: e.to_string(),
        })?;
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let settings = Self::default();
                settings.save_to(path)?;
                Ok(settings)
            }
        }
    }

    /// Load from disk, returning defaults on error. Never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path().map_err(|e| ConfigError::SaveFailed {
            path: PathBuf::from("~/.config"),
            message: e.to_string(),
        })?;
        self.save_to(&path)
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get a settings value as a string by key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "fetch_interval_ms" => Some(self.fetch_interval_ms.to_string()),
            "fetch_timeout_ms" => Some(self.fetch_timeout_ms.to_string()),
            "high_accuracy" => Some(self.high_accuracy.to_string()),
            "fetch_enabled" => Some(self.fetch_enabled.to_string()),
            "notify_enabled" => Some(self.notify_enabled.to_string()),
            _ => None,
        }
    }

    /// Set a settings value by key and persist (save-on-write).
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the settings cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        match key {
            "fetch_interval_ms" => {
                self.fetch_interval_ms = value.parse().map_err(|_| {
                    invalid(format!("cannot parse '{value}' as milliseconds"))
                })?;
            }
            "fetch_timeout_ms" => {
                self.fetch_timeout_ms = value.parse().map_err(|_| {
                    invalid(format!("cannot parse '{value}' as milliseconds"))
                })?;
            }
            "high_accuracy" => {
                self.high_accuracy = value
                    .parse()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?;
            }
            "fetch_enabled" => {
                self.fetch_enabled = value
                    .parse()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?;
            }
            "notify_enabled" => {
                self.notify_enabled = value
                    .parse()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        self.save()
    }

    /// All keys with their current values, for `config list`.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("fetch_interval_ms", self.fetch_interval_ms.to_string()),
            ("fetch_timeout_ms", self.fetch_timeout_ms.to_string()),
            ("high_accuracy", self.high_accuracy.to_string()),
            ("fetch_enabled", self.fetch_enabled.to_string()),
            ("notify_enabled", self.notify_enabled.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_roundtrip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.fetch_interval_ms, 5_000);
        assert_eq!(parsed.fetch_timeout_ms, 15_000);
        assert!(parsed.fetch_enabled);
        assert!(parsed.notify_enabled);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: Settings = toml::from_str("fetch_interval_ms = 2000\n").unwrap();
        assert_eq!(parsed.fetch_interval_ms, 2_000);
        assert_eq!(parsed.fetch_timeout_ms, 15_000);
        assert!(parsed.high_accuracy);
    }

    #[test]
    fn get_returns_string_values() {
        let settings = Settings::default();
        assert_eq!(settings.get("fetch_interval_ms").as_deref(), Some("5000"));
        assert_eq!(settings.get("notify_enabled").as_deref(), Some("true"));
        assert!(settings.get("missing_key").is_none());
    }

    #[test]
    fn save_failure_reports_a_save_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("config.toml");
        let err = Settings::default().save_to(&path).unwrap_err();
        assert!(matches!(err, ConfigError::SaveFailed { .. }));
    }

    #[test]
    fn unparsable_file_reports_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "fetch_interval_ms = \"nope\"\n").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::LoadFailed { .. }));
    }

    #[test]
    fn entries_cover_every_key() {
        let settings = Settings::default();
        let entries = settings.entries();
        assert_eq!(entries.len(), 5);
        for (key, value) in entries {
            assert_eq!(settings.get(key), Some(value));
        }
    }
}
