//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! backend URL, request timeout, hydration policy, storage backend, and the
//! last identifier used to sign in.
//!
//! Configuration is stored at `~/.config/campus-session/config.json`.
//! Environment variables (typically from a `.env` file) override it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::auth::HydrationPolicy;
use crate::storage::StorageBackend;

/// Application name used for config/data/cache directory paths
const APP_NAME: &str = "campus-session";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when nothing is configured; the Android emulator's alias
/// for the host machine.
const DEFAULT_API_BASE_URL: &str = "http://10.0.2.2:3000";

pub const ENV_API_URL: &str = "CAMPUS_API_URL";
pub const ENV_STORAGE: &str = "CAMPUS_STORAGE";
pub const ENV_HYDRATION: &str = "CAMPUS_HYDRATION";
pub const ENV_TIMEOUT_SECS: &str = "CAMPUS_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub hydration_policy: HydrationPolicy,
    pub storage_backend: StorageBackend,
    pub last_identifier: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            hydration_policy: HydrationPolicy::default(),
            storage_backend: StorageBackend::default(),
            last_identifier: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::from_json(&contents)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config file")
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

    /// Apply environment overrides. Unparseable values are logged and ignored.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_STORAGE) {
            match StorageBackend::parse(&raw) {
                Some(backend) => self.storage_backend = backend,
                None => warn!(value = %raw, "Ignoring unknown {}", ENV_STORAGE),
            }
        }
        if let Some(raw) = lookup(ENV_HYDRATION) {
            match HydrationPolicy::parse(&raw) {
                Some(policy) => self.hydration_policy = policy,
                None => warn!(value = %raw, "Ignoring unknown {}", ENV_HYDRATION),
            }
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_TIMEOUT_SECS),
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where the encrypted file store keeps its files
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Where log files go
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
