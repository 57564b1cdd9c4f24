//! TOML-based runtime configuration.
//!
//! Stored at `<config dir>/tasktimer/config.toml`. Every field is optional;
//! a missing file yields defaults.
//!
//! ```toml
//! db_path = "/home/me/.local/share/tasktimer/tasks.db"
//! log_dir = "/home/me/.local/share/tasktimer/logs"
//! log_level = "info"
//! reset_time = "02:00"
//! tick_interval_ms = 1000
//! adjust_step_secs = 60
//! ```

use crate::logging::default_log_level;
use crate::scheduler::default_reset_time;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR_NAME: &str = "tasktimer";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "tasks.db";
const LOG_DIR_NAME: &str = "logs";
const RESET_TIME_FORMAT: &str = "%H:%M";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Serialize(toml::ser::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "config io error at `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config file `{}`: {source}", path.display())
            }
            Self::Serialize(err) => write!(f, "failed to serialize config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Runtime configuration for the timer core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_level")]
    pub log_level: String,
    /// Local wall-clock time of the daily reset, `HH:MM`.
    #[serde(default = "default_reset_time_text")]
    pub reset_time: String,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Seconds added/removed by one manual adjustment.
    #[serde(default = "default_adjust_step_secs")]
    pub adjust_step_secs: u64,
}

fn default_db_path() -> PathBuf {
    data_dir().join(DB_FILE_NAME)
}
fn default_log_dir() -> PathBuf {
    data_dir().join(LOG_DIR_NAME)
}
fn default_level() -> String {
    default_log_level().to_string()
}
fn default_reset_time_text() -> String {
    default_reset_time().format(RESET_TIME_FORMAT).to_string()
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_adjust_step_secs() -> u64 {
    60
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_dir: default_log_dir(),
            log_level: default_level(),
            reset_time: default_reset_time_text(),
            tick_interval_ms: default_tick_interval_ms(),
            adjust_step_secs: default_adjust_step_secs(),
        }
    }
}

impl TimerConfig {
    /// Loads the config from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_path())
    }

    /// Loads and validates the config at `path`; a missing file yields
    /// defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str::<Self>(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as TOML, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let text = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            create_dir(parent)?;
        }
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reset_time()?;
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.adjust_step_secs == 0 {
            return Err(ConfigError::Invalid(
                "adjust_step_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed `reset_time`.
    pub fn reset_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(self.reset_time.trim(), RESET_TIME_FORMAT).map_err(|_| {
            ConfigError::Invalid(format!(
                "reset_time must be HH:MM, got `{}`",
                self.reset_time
            ))
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Creates the database parent directory and the log directory.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.db_path.parent() {
            create_dir(parent)?;
        }
        create_dir(&self.log_dir)
    }
}

/// Default config file location.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

fn create_dir(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, TimerConfig};
    use chrono::NaiveTime;
    use std::time::Duration;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TimerConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, TimerConfig::default());
        assert_eq!(
            config.reset_time().unwrap(),
            NaiveTime::from_hms_opt(2, 0, 0).unwrap()
        );
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "reset_time = \"04:30\"\ntick_interval_ms = 250\n").unwrap();

        let config = TimerConfig::load_from(&path).unwrap();
        assert_eq!(
            config.reset_time().unwrap(),
            NaiveTime::from_hms_opt(4, 30, 0).unwrap()
        );
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.adjust_step_secs, 60);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "reset_time = \"25:99\"\n").unwrap();
        assert!(matches!(
            TimerConfig::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));

        std::fs::write(&path, "tick_interval_ms = 0\n").unwrap();
        assert!(matches!(
            TimerConfig::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));

        std::fs::write(&path, "tick_interval_ms = \"fast\"\n").unwrap();
        assert!(matches!(
            TimerConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = TimerConfig {
            db_path: dir.path().join("tasks.db"),
            log_dir: dir.path().join("logs"),
            log_level: "warn".to_string(),
            reset_time: "03:15".to_string(),
            tick_interval_ms: 500,
            adjust_step_secs: 120,
        };

        config.save_to(&path).unwrap();
        assert_eq!(TimerConfig::load_from(&path).unwrap(), config);
    }
}
