//! Runtime configuration, read from `~/.agenda-oficinas/config.toml` when the
//! file exists. Every key is optional.
//!
//! ```toml
//! database_path = "/srv/agenda/agenda.sqlite"
//! log_level = "debug"
//!
//! [rules]
//! reject_double_booking = true
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;

use crate::agenda::Rules;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".agenda-oficinas";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "agenda.sqlite";
const LOG_FILE_NAME: &str = "agenda.log";
/// Overrides `database_path` when set.
pub const DB_ENV_VAR: &str = "AGENDA_DB";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub log_level: String,
    pub rules: Rules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            log_path: None,
            log_level: "info".to_string(),
            rules: Rules::default(),
        }
    }
}

impl Config {
    /// Load the config file from the data directory (defaults when absent)
    /// and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = data_dir()?.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        if let Some(db) = env::var_os(DB_ENV_VAR) {
            config.database_path = Some(PathBuf::from(db));
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join(DB_FILE_NAME)),
        }
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join(LOG_FILE_NAME)),
        }
    }
}

/// Resolve the application data directory inside the user's home.
fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_means_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.rules.reject_double_booking);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn reads_every_key() {
        let config = Config::from_toml(
            r#"
            database_path = "/tmp/agenda.sqlite"
            log_path = "/tmp/agenda.log"
            log_level = "debug"

            [rules]
            reject_double_booking = true
            "#,
        )
        .unwrap();
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/agenda.sqlite")
        );
        assert_eq!(config.log_path().unwrap(), PathBuf::from("/tmp/agenda.log"));
        assert_eq!(config.log_level, "debug");
        assert!(config.rules.reject_double_booking);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(Config::from_toml("log_level = 3").is_err());
    }
}
