//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, the token storage backend and the last
//! used username.
//!
//! Configuration is stored at `~/.config/todosync/config.json`. The base URL
//! can be overridden with the `TODOSYNC_API_URL` environment variable.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::TokenBackend;

/// Application name used for config/data directory paths
const APP_NAME: &str = "todosync";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides `api_url`
pub const API_URL_ENV: &str = "TODOSYNC_API_URL";

/// Base URL used when neither the environment nor the config file names one
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    #[serde(default)]
    pub token_backend: TokenBackend,
    /// Transport timeout; requests may hang indefinitely when unset
    pub request_timeout_secs: Option<u64>,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the token file when the file backend is selected
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Effective base URL: environment, then config file, then the default
    pub fn api_url(&self) -> String {
        self.resolve_api_url(std::env::var(API_URL_ENV).ok())
    }

    fn resolve_api_url(&self, env_value: Option<String>) -> String {
        env_value
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
