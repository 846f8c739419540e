//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the API base URL, where tokens are persisted, and the last used
//! username.
//!
//! Configuration is stored at `~/.config/blogline/config.json`. The
//! `BLOGLINE_API_URL` and `BLOGLINE_TOKEN_BACKEND` environment variables
//! override the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::{HttpTransport, RefreshFailurePolicy, SessionClient, DEFAULT_TIMEOUT_SECS};
use crate::auth::{
    FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore, DEFAULT_KEYRING_SERVICE,
};

/// Application name used for config/data directory paths
const APP_NAME: &str = "blogline";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend served by a local development server
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/";

pub const ENV_API_URL: &str = "BLOGLINE_API_URL";
pub const ENV_TOKEN_BACKEND: &str = "BLOGLINE_TOKEN_BACKEND";

/// Where the access/refresh pair is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenBackend {
    /// OS keychain
    #[default]
    Keyring,
    /// `tokens.json` in the data directory
    File,
    /// Not persisted
    Memory,
}

impl FromStr for TokenBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" => Ok(TokenBackend::Keyring),
            "file" => Ok(TokenBackend::File),
            "memory" => Ok(TokenBackend::Memory),
            other => Err(anyhow::anyhow!(
                "Unknown token backend '{}' (expected keyring, file or memory)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub token_backend: TokenBackend,
    pub keyring_service: String,
    pub refresh_failure: RefreshFailurePolicy,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            token_backend: TokenBackend::default(),
            keyring_service: DEFAULT_KEYRING_SERVICE.to_string(),
            refresh_failure: RefreshFailurePolicy::default(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from environment-style lookups. Invalid values are
    /// logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(raw) = lookup(ENV_TOKEN_BACKEND) {
            match raw.parse() {
                Ok(backend) => self.token_backend = backend,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_TOKEN_BACKEND),
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>> {
        Ok(match self.token_backend {
            TokenBackend::Keyring => Arc::new(KeyringTokenStore::new(self.keyring_service.clone())),
            TokenBackend::File => Arc::new(FileTokenStore::new(&self.data_dir()?)),
            TokenBackend::Memory => Arc::new(MemoryTokenStore::new()),
        })
    }

    /// Construct the one client the application threads through its code.
    pub fn build_client(&self) -> Result<SessionClient> {
        let transport = HttpTransport::new(
            &self.api_url,
            Duration::from_secs(self.request_timeout_secs),
        )
        .context("Failed to build HTTP transport")?;
        Ok(SessionClient::with_policy(
            Arc::new(transport),
            self.token_store()?,
            self.refresh_failure,
        ))
    }
}
