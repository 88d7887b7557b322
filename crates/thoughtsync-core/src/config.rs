//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! where the published snapshot lives, which role this device plays, and the
//! timing knobs for fetching and polling.
//!
//! Configuration is stored at `~/.config/thoughtsync/config.json`. Any value
//! can be overridden from the environment (or a `.env` file loaded by the
//! binary) using the `THOUGHTSYNC_*` variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::sync::{EnvironmentSignals, Role};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "thoughtsync";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Published snapshot location.
pub const DEFAULT_REMOTE_URL: &str = "https://gift-aha.github.io/knowledge-base2/thought-data.json";

/// Background poll interval.
/// Five minutes keeps consumers reasonably current without hammering static hosting.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Remote fetch timeout in seconds.
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

const ENV_REMOTE_URL: &str = "THOUGHTSYNC_REMOTE_URL";
const ENV_ROLE: &str = "THOUGHTSYNC_ROLE";
const ENV_USER_AGENT: &str = "THOUGHTSYNC_USER_AGENT";
const ENV_CACHE_DIR: &str = "THOUGHTSYNC_CACHE_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub remote_url: Option<String>,
    pub role: Option<Role>,
    pub user_agent: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
    pub cache_dir: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply `THOUGHTSYNC_*` overrides using `lookup` to read variables.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_REMOTE_URL) {
            self.remote_url = Some(url);
        }
        if let Some(role) = lookup(ENV_ROLE) {
            match role.parse() {
                Ok(role) => self.role = Some(role),
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_ROLE),
            }
        }
        if let Some(agent) = lookup(ENV_USER_AGENT) {
            self.user_agent = Some(agent);
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn remote_url(&self) -> &str {
        self.remote_url.as_deref().unwrap_or(DEFAULT_REMOTE_URL)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        )
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(
            self.fetch_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
        )
    }

    pub fn signals(&self) -> EnvironmentSignals {
        EnvironmentSignals {
            user_agent: self.user_agent.clone(),
            role_override: self.role,
        }
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Where exports land; the current directory unless configured.
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
