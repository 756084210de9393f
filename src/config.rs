//! Config - Persisted settings of the command line host

use crate::{Error, Result, ACTIVE_DIR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the config file
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("saveswap")
}

/// Default config file location
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// A save directory is usable once it has the active directory inside
pub fn check_save_dir(dir: &Path) -> Result<()> {
    if dir.join(ACTIVE_DIR).is_dir() {
        Ok(())
    } else {
        Err(Error::InvalidSaveDir(dir.to_path_buf()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Game save directory, the one holding `sys`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dir: Option<PathBuf>,

    /// Directory with the template save files for new profiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_dir: Option<PathBuf>,

    /// Default log level, overridden by command line options and `RUST_LOG`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<log::LevelFilter>,
}

impl Config {
    /// Load from `path`, or from the default location
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load_from(&config_path()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {path:?}, using defaults");
            return Ok(Self::default());
        }
        log::debug!("loading config from {path:?}");
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        log::debug!("saved config to {path:?}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("config.json"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            save_dir: Some(PathBuf::from("/games/save")),
            seed_dir: None,
            log_level: Some(log::LevelFilter::Debug),
        };

        config.save_to(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("seed_dir"));
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn save_dir_needs_active_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            check_save_dir(dir.path()),
            Err(Error::InvalidSaveDir(_))
        ));
        std::fs::create_dir(dir.path().join(ACTIVE_DIR)).unwrap();
        assert!(check_save_dir(dir.path()).is_ok());
    }
}
