//! Application configuration.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional `config.toml` under the user's config directory, then
//! `FLEETDESK_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "fleetdesk";

const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "FLEETDESK";

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the three collection files and the log directory.
    pub data_dir: PathBuf,
    /// File name of the vehicle collection inside `data_dir`.
    pub vehicles_file: String,
    /// File name of the client collection inside `data_dir`.
    pub clients_file: String,
    /// File name of the booking collection inside `data_dir`.
    pub bookings_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            vehicles_file: "vehicles.csv".to_string(),
            clients_file: "clients.csv".to_string(),
            bookings_file: "bookings.csv".to_string(),
        }
    }
}

impl AppConfig {
    /// Build a configuration rooted at `data_dir` with default file names.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load settings from the default config file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load settings from `path` (optional) layered over defaults and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
            .set_default("vehicles_file", defaults.vehicles_file)?
            .set_default("clients_file", defaults.clients_file)?
            .set_default("bookings_file", defaults.bookings_file)?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// Directory where the binary writes its log files.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// Location of the user config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// Default data directory, falling back to the working directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Write a commented default config file unless one already exists.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let defaults = AppConfig::default();
    let contents = format!(
        "# fleetdesk configuration\n\
         # Every key can also be set through FLEETDESK_<KEY> environment variables.\n\n\
         data_dir = {:?}\n\
         vehicles_file = {:?}\n\
         clients_file = {:?}\n\
         bookings_file = {:?}\n",
        defaults.data_dir.to_string_lossy(),
        defaults.vehicles_file,
        defaults.clients_file,
        defaults.bookings_file,
    );
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}
