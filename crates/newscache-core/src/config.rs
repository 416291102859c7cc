//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, an optional cache directory override,
//! the fallback observer location and the freshness thresholds.
//!
//! Configuration is stored at `~/.config/newscache/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::CachePolicy;
use crate::geo::Coordinates;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "newscache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "NEWSCACHE_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    /// Used when the caller has no position fix.
    pub default_location: Option<Coordinates>,
    pub policy: CachePolicy,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        if let Some(location) = config.default_location {
            location
                .validate()
                .context("Invalid default_location in config")?;
        }
        Ok(config)
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

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Base URL of the content API: environment first, then config.
    pub fn api_base_url(&self) -> Result<String> {
        Self::resolve_api_base_url(std::env::var(API_URL_ENV).ok(), self.api_base_url.as_deref())
    }

    fn resolve_api_base_url(from_env: Option<String>, from_config: Option<&str>) -> Result<String> {
        from_env
            .filter(|url| !url.trim().is_empty())
            .or_else(|| from_config.map(str::to_string))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No API base URL configured; set {} or api_base_url in {}",
                    API_URL_ENV,
                    CONFIG_FILE
                )
            })
    }
}
