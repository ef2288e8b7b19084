//! Application configuration
//!
//! Stored as JSON. Every field has a default, so a partial file (or no file)
//! is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_NAMESPACE: &str = "clarity";
pub const DEFAULT_HABIT_COLOR: &str = "#c85a2a";
pub const DEFAULT_HABIT_ICON: &str = "⭐";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Backend for the on-device key-value storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocalBackend {
    /// Lost when the process exits
    #[default]
    Memory,
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Prefix of every local storage key
    pub storage_namespace: String,
    pub local_backend: LocalBackend,
    /// Directory for the rolling log file; logging to file is off when unset
    pub log_dir: Option<PathBuf>,
    pub app_name: String,
    /// Days of habit logs the remote subscription covers
    pub habit_log_window_days: u32,
    /// Upper bound on the backward walk when computing streaks
    pub streak_lookback_days: u32,
    pub default_habit_color: String,
    pub default_habit_icon: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_namespace: DEFAULT_NAMESPACE.to_string(),
            local_backend: LocalBackend::default(),
            log_dir: None,
            app_name: "Clarity".to_string(),
            habit_log_window_days: 30,
            streak_lookback_days: crate::streak::DEFAULT_LOOKBACK_DAYS,
            default_habit_color: DEFAULT_HABIT_COLOR.to_string(),
            default_habit_icon: DEFAULT_HABIT_ICON.to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, text).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.habit_log_window_days, 30);
        assert_eq!(config.streak_lookback_days, 365);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"storage_namespace":"test","local_backend":{"kind":"sqlite","path":"/tmp/c.db"}}"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.storage_namespace, "test");
        assert_eq!(
            config.local_backend,
            LocalBackend::Sqlite { path: PathBuf::from("/tmp/c.db") }
        );
        assert_eq!(config.default_habit_icon, DEFAULT_HABIT_ICON);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            habit_log_window_days: 14,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }
}
