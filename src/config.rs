//! Client configuration management.
//!
//! Configuration covers the backend base URL, the identity-provider
//! endpoints, and the provider API key. A config can be constructed
//! directly, loaded from `~/.config/nextfare/config.json`, or overridden
//! through environment variables (`NEXTFARE_API_URL`, `NEXTFARE_API_KEY`,
//! `NEXTFARE_IDENTITY_URL`, `NEXTFARE_TOKEN_URL`).
//!
//! Every client takes its config at construction; there is no
//! process-wide configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
const APP_NAME: &str = "nextfare";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Fallback backend URL for local development
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Identity-provider endpoint for password sign-in and sign-up
const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// Endpoint for the refresh-token exchange
const DEFAULT_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com";

/// HTTP request timeout in seconds.
/// The transport enforces this per request; a timed-out request fails
/// like any other network error and is not retried.
const REQUEST_TIMEOUT_SECS: u64 = 10;

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_identity_base_url() -> String {
    DEFAULT_IDENTITY_BASE_URL.to_string()
}

fn default_token_base_url() -> String {
    DEFAULT_TOKEN_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_identity_base_url")]
    pub identity_base_url: String,
    #[serde(default = "default_token_base_url")]
    pub token_base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            identity_base_url: default_identity_base_url(),
            token_base_url: default_token_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Config for the given backend and provider key, with production
    /// identity endpoints.
    pub fn new(api_base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Load the config file if present, then apply environment overrides.
    /// A `.env` file is honored when one exists.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let path = Self::config_path()?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load a config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save the config to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("NEXTFARE_API_URL") {
            self.api_base_url = url;
        }
        if let Ok(key) = std::env::var("NEXTFARE_API_KEY") {
            self.api_key = key;
        }
        if let Ok(url) = std::env::var("NEXTFARE_IDENTITY_URL") {
            self.identity_base_url = url;
        }
        if let Ok(url) = std::env::var("NEXTFARE_TOKEN_URL") {
            self.token_base_url = url;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_key": "k-123"}"#).expect("parse failed");
        assert_eq!(config.api_key, "k-123");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.identity_base_url, DEFAULT_IDENTITY_BASE_URL);
        assert_eq!(config.token_base_url, DEFAULT_TOKEN_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(REQUEST_TIMEOUT_SECS));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let path = dir.path().join("config.json");

        let mut config = ClientConfig::new("https://api.nextfare.example", "k-456");
        config.timeout_secs = 5;
        config.save_to(&path).expect("save failed");

        let loaded = ClientConfig::load_from(&path).expect("load failed");
        assert_eq!(loaded.api_base_url, "https://api.nextfare.example");
        assert_eq!(loaded.api_key, "k-456");
        assert_eq!(loaded.timeout_secs, 5);
    }
}
