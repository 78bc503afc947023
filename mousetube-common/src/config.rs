//! Configuration loading and data folder resolution
//!
//! Each setting is resolved in priority order:
//! 1. Environment variable (highest priority)
//! 2. TOML config file (`~/.config/mousetube/config.toml`, then
//!    `/etc/mousetube/config.toml` on Linux)
//! 3. Compiled default
//!
//! The Zenodo access token has no default: a missing token is a hard
//! startup failure.

use crate::{Error, Result};
use std::path::PathBuf;

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory (database file lives here)
    pub data_dir: PathBuf,
    /// Root of permanent media storage (`/media/...` links)
    pub media_root: PathBuf,
    /// Root of the upload staging area (`/temp/...` links)
    pub temp_root: PathBuf,
    /// SQLite database file path
    pub database_path: PathBuf,
    /// HTTP bind address
    pub bind_addr: String,
    /// Zenodo API base URL, e.g. `https://sandbox.zenodo.org/api`
    pub zenodo_api: String,
    /// Zenodo access token (required)
    pub zenodo_token: String,
}

impl Settings {
    /// Load settings from environment, config file, and defaults.
    pub fn load() -> Result<Self> {
        let file = load_config_file();

        let data_dir = lookup("MOUSETUBE_DATA_DIR", file.as_ref(), "data_dir")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let media_root = lookup("MOUSETUBE_MEDIA_ROOT", file.as_ref(), "media_root")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("media"));

        let temp_root = lookup("MOUSETUBE_TEMP_ROOT", file.as_ref(), "temp_root")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("temp"));

        let bind_addr = lookup("MOUSETUBE_BIND", file.as_ref(), "bind_addr")
            .unwrap_or_else(|| "127.0.0.1:5730".to_string());

        let zenodo_api = lookup("ZENODO_API", file.as_ref(), "zenodo_api")
            .unwrap_or_else(|| "https://sandbox.zenodo.org/api".to_string());

        let zenodo_token = lookup("ZENODO_TOKEN", file.as_ref(), "zenodo_token")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::Config("Zenodo token not configured (ZENODO_TOKEN)".to_string())
            })?;

        let database_path = data_dir.join("mousetube.db");

        Ok(Self {
            data_dir,
            media_root,
            temp_root,
            database_path,
            bind_addr,
            zenodo_api,
            zenodo_token,
        })
    }

    /// Create the data, media, and temp directories if missing.
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.media_root)?;
        std::fs::create_dir_all(&self.temp_root)?;
        Ok(())
    }
}

/// Resolve a single setting: environment first, then config file key.
fn lookup(env_var: &str, file: Option<&toml::Value>, key: &str) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            return Some(value);
        }
    }
    file.and_then(|config| config.get(key))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Load the TOML config file if one exists at a known location.
fn load_config_file() -> Option<toml::Value> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("mousetube").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/mousetube/config.toml"));
    }

    for path in candidates {
        if let Ok(contents) = std::fs::read_to_string(&path) {
            match toml::from_str::<toml::Value>(&contents) {
                Ok(value) => return Some(value),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
                }
            }
        }
    }
    None
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mousetube"))
        .unwrap_or_else(|| PathBuf::from("./mousetube_data"))
}
