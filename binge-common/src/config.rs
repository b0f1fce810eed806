//! Deployment environment and data folder resolution
//!
//! The deployment environment selects which recommendation configuration is
//! active (see `binge-experiments`). The data folder holds the SQLite
//! database backing behavioral events and experiment state.

use crate::{Error, Result};
use std::path::PathBuf;
use tracing::warn;

/// Deployment environment for configuration selection
///
/// Resolved from the `BINGE_ENV` process variable. Anything other than
/// `staging` or `production` selects `Development`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Resolve the environment from `BINGE_ENV`, falling back to Development.
    pub fn detect() -> Self {
        match std::env::var("BINGE_ENV") {
            Ok(value) => Self::parse(&value),
            Err(_) => Environment::Development,
        }
    }

    /// Parse an environment name. Unrecognized values fall back to
    /// Development with a warning rather than failing startup.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" => Environment::Staging,
            "development" | "dev" | "" => Environment::Development,
            other => {
                warn!("Unrecognized BINGE_ENV '{}', using development", other);
                Environment::Development
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data folder resolution priority order:
/// 1. Explicit argument (highest priority)
/// 2. `BINGE_DATA_DIR` environment variable
/// 3. TOML config file (`data_dir` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(explicit: Option<&str>) -> Result<PathBuf> {
    // Priority 1: explicit argument
    if let Some(path) = explicit {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var("BINGE_DATA_DIR") {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_dir) = config.get("data_dir").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(data_dir));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_data_dir())
}

/// Path of the SQLite database file inside the resolved data folder.
pub fn database_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("bingeboard.db")
}

/// Locate the configuration file for the platform
fn locate_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("bingeboard").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/bingeboard/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default data folder path
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("bingeboard"))
        .unwrap_or_else(|| PathBuf::from("./bingeboard_data"))
}
