use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::{
    dashboard::{DEFAULT_CITIES, DEFAULT_REFRESH_INTERVAL},
    location::DEFAULT_FALLBACK_CITY,
    provider::openweather::DEFAULT_BASE_URL,
};

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "SKYGLANCE_API_KEY";

/// Top-level configuration stored on disk. Every field is optional.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// default_cities = ["Berlin", "London"]
/// fallback_city = "Boston"
/// refresh_interval_secs = 600
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenWeather base URL, without the `/data/2.5/weather` path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_cities: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval_secs: Option<u64>,
}

impl Config {
    /// API key from the environment, else from the config file.
    pub fn resolve_api_key(&self) -> Result<String> {
        pick_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn default_cities(&self) -> Vec<String> {
        match &self.default_cities {
            Some(cities) => cities.clone(),
            None => DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn fallback_city(&self) -> &str {
        self.fallback_city.as_deref().unwrap_or(DEFAULT_FALLBACK_CITY)
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REFRESH_INTERVAL)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the persistent key-value store holding the unit and cached weather.
    pub fn store_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.data_dir().join("store.json"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "skyglance", "skyglance")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}

fn pick_api_key(from_env: Option<String>, from_file: Option<&str>) -> Result<String> {
    from_env
        .filter(|k| !k.trim().is_empty())
        .or_else(|| from_file.filter(|k| !k.trim().is_empty()).map(str::to_owned))
        .ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `skyglance configure` or set {API_KEY_ENV}."
            )
        })
}
