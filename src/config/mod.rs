//! Configuration persistence.
//!
//! The record is stored as pretty-printed JSON at
//! `<user config dir>/HydraReminder/config.json`. The location can be
//! overridden with `--config <path>` or the `HYDRA_REMINDER_CONFIG`
//! environment variable.
//!
//! # Example
//!
//! ```no_run
//! use hydra_reminder::config::ConfigStore;
//!
//! let store = ConfigStore::resolve(None)?;
//! let mut config = store.load()?;
//! config.duration_minutes = 45;
//! store.save(&config)?;
//! # Ok::<(), hydra_reminder::config::ConfigError>(())
//! ```

pub mod error;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use error::{ConfigError, Result};

use crate::types::ReminderConfig;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "HYDRA_REMINDER_CONFIG";

const APP_DIR: &str = "HydraReminder";
const FILE_NAME: &str = "config.json";

/// Reads and writes the persisted [`ReminderConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user config directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigDirNotFound`] if the platform reports no
    /// config directory.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
        Ok(base.join(APP_DIR).join(FILE_NAME))
    }

    /// Picks the explicit path, then `HYDRA_REMINDER_CONFIG`, then the
    /// default location.
    ///
    /// # Errors
    ///
    /// Returns an error only when falling back to the default location
    /// fails.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(Self::new(path));
        }
        Self::default_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the record. A missing file is created with the defaults.
    ///
    /// Keys absent from the file take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<ReminderConfig> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let config = ReminderConfig::default();
                if let Err(err) = self.save(&config) {
                    tracing::warn!(path = %self.path.display(), error = %err, "既定の設定を書き込めませんでした");
                }
                return Ok(config);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Loads the record, falling back to the defaults on any error.
    pub fn load_or_default(&self) -> ReminderConfig {
        self.load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "設定を読み込めないため既定値を使用します");
            ReminderConfig::default()
        })
    }

    /// Writes the record, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, config: &ReminderConfig) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ConfigError::DirectoryCreation)?;
        }
        let json = serde_json::to_string_pretty(config).map_err(ConfigError::Serialize)?;
        fs::write(&self.path, json).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "設定を保存しました");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertStyle, Modifiers};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("nested").join(FILE_NAME))
    }

    #[test]
    fn test_load_missing_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let config = store.load().unwrap();
        assert_eq!(config, ReminderConfig::default());
        assert!(store.path().exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let config = ReminderConfig {
            duration_minutes: 45,
            alert_style: AlertStyle::Blink,
            hotkey_enabled: true,
            hotkey_modifiers: Modifiers::PRESETS[2],
            hotkey_reset_key: 0x48,
            ..ReminderConfig::default()
        };

        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"hotkey_enabled": true, "unknown": 1}"#).unwrap();

        let config = store.load().unwrap();
        assert!(config.hotkey_enabled);
        assert_eq!(config.duration_minutes, 30);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.load(), Err(ConfigError::Parse { .. })));
        assert_eq!(store.load_or_default(), ReminderConfig::default());
    }

    #[test]
    fn test_saved_file_is_pretty_json() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&ReminderConfig::default()).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\n  \"duration_minutes\": 30"));
    }

    #[test]
    fn test_resolve_prefers_explicit_path() {
        let store = ConfigStore::resolve(Some(PathBuf::from("/tmp/explicit.json"))).unwrap();
        assert_eq!(store.path(), Path::new("/tmp/explicit.json"));
    }

    #[test]
    fn test_default_path_layout() {
        if let Ok(path) = ConfigStore::default_path() {
            assert!(path.ends_with(Path::new(APP_DIR).join(FILE_NAME)));
        }
    }
}
