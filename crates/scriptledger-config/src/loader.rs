use std::fs;
use std::path::{Path, PathBuf};

use scriptledger_common::{Error, Result};
use tracing::debug;

use crate::model::{AppConfig, DatabaseConfig};

const CONFIG_FILES: [&str; 2] = ["config.yml", "config.toml"];

/// Finds the config directory, reads the config file in it and decides where
/// the database file lives.
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::with_dir(default_config_dir())
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// The file [`load`](Self::load) reads. YAML wins when both exist.
    pub fn config_file(&self) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| self.config_dir.join(name))
            .find(|path| path.is_file())
    }

    /// Reads the config file, or returns defaults when there is none.
    pub fn load(&self) -> Result<AppConfig> {
        let Some(path) = self.config_file() else {
            return Ok(AppConfig::default());
        };

        let contents = fs::read_to_string(&path)?;
        let parsed: std::result::Result<AppConfig, String> =
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => toml::from_str(&contents).map_err(|e| e.to_string()),
                _ => serde_yaml::from_str(&contents).map_err(|e| e.to_string()),
            };

        parsed.map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Database file to use. A path given on the command line is taken relative
    /// to the working directory; the configured one relative to the config
    /// directory.
    pub fn database_path(
        &self,
        config: &DatabaseConfig,
        command_line: Option<&Path>,
    ) -> Result<PathBuf> {
        match command_line {
            Some(path) if path.is_absolute() => Ok(path.to_path_buf()),
            Some(path) => Ok(std::env::current_dir()?.join(path)),
            None => Ok(config.resolved_path(&self.config_dir)),
        }
    }

    /// Creates the directory that will hold `database`, which for the default
    /// path is the config directory itself.
    pub fn ensure_database_dir(&self, database: &Path) -> Result<()> {
        let Some(parent) = database.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };

        if !parent.is_dir() {
            debug!("creating {}", parent.display());
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// `<config dir>/scriptledger`, unless only `~/.scriptledger` exists.
fn default_config_dir() -> PathBuf {
    let xdg = dirs::config_dir().map(|c| c.join("scriptledger"));
    let dotdir = dirs::home_dir().map(|h| h.join(".scriptledger"));

    match (xdg, dotdir) {
        (Some(xdg), Some(dotdir)) if !xdg.is_dir() && dotdir.is_dir() => dotdir,
        (Some(xdg), _) => xdg,
        (None, Some(dotdir)) => dotdir,
        (None, None) => PathBuf::from(".scriptledger"),
    }
}
