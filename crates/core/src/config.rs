use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::hub::huggingface::DEFAULT_ENDPOINT;
use crate::messages::Language;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Hub connection settings
    #[serde(default)]
    pub hub: HubConfig,

    /// Download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Console settings
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Base URL of the hub
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Maximum number of search results to list
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root for model directories, relative to the working directory unless absolute
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    /// Message language; detected from the locale when unset
    #[serde(default)]
    pub language: Option<Language>,

    /// Clear the terminal before reporting a finished download
    #[serde(default = "default_clear_on_success")]
    pub clear_on_success: bool,

    /// Exit after one download attempt instead of returning to search
    #[serde(default)]
    pub exit_after_download: bool,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_search_limit() -> usize {
    10
}

fn default_directory() -> PathBuf {
    PathBuf::from("models")
}

fn default_clear_on_success() -> bool {
    true
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            search_limit: default_search_limit(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            language: None,
            clear_on_success: default_clear_on_success(),
            exit_after_download: false,
        }
    }
}

/// Keys accepted by [`Config::get`] and [`Config::set`].
pub const KEYS: [&str; 6] = [
    "hub.endpoint",
    "hub.search_limit",
    "download.directory",
    "ui.language",
    "ui.clear_on_success",
    "ui.exit_after_download",
];

impl Config {
    /// Get the base directory: ~/.config/hubfetch/
    pub fn base_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("hubfetch"))
    }

    /// Get the config file path: ~/.config/hubfetch/config.toml
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Save config to default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Language from config, or detected from the environment
    pub fn language(&self) -> Language {
        self.ui.language.unwrap_or_else(Language::detect)
    }

    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            "hub.endpoint" => Ok(self.hub.endpoint.clone()),
            "hub.search_limit" => Ok(self.hub.search_limit.to_string()),
            "download.directory" => Ok(self.download.directory.display().to_string()),
            "ui.language" => Ok(self
                .ui
                .language
                .map(|l| l.to_string())
                .unwrap_or_default()),
            "ui.clear_on_success" => Ok(self.ui.clear_on_success.to_string()),
            "ui.exit_after_download" => Ok(self.ui.exit_after_download.to_string()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "hub.endpoint" => self.hub.endpoint = value.trim_end_matches('/').to_string(),
            "hub.search_limit" => {
                let limit: usize = value.parse()?;
                if limit == 0 {
                    anyhow::bail!("hub.search_limit must be at least 1");
                }
                self.hub.search_limit = limit;
            }
            "download.directory" => self.download.directory = value.into(),
            "ui.language" => {
                self.ui.language = if value.is_empty() {
                    None
                } else {
                    Some(value.parse().map_err(anyhow::Error::msg)?)
                }
            }
            "ui.clear_on_success" => self.ui.clear_on_success = value.parse()?,
            "ui.exit_after_download" => self.ui.exit_after_download = value.parse()?,
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }
}
