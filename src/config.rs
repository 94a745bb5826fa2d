use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const APP_DIR: &str = "inbox-sync";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_engage_endpoint")]
    pub engage_endpoint: String,

    pub account_token: Option<String>,

    #[serde(default = "default_device_identifier")]
    pub device_identifier: String,

    /// Upper bound on pages fetched in one round.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("inbox.db")
        .to_string_lossy()
        .to_string()
}

fn default_engage_endpoint() -> String {
    "https://engage.rover.io".to_string()
}

fn default_device_identifier() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_max_pages() -> usize {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            engage_endpoint: default_engage_endpoint(),
            account_token: None,
            device_identifier: default_device_identifier(),
            max_pages: default_max_pages(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Reads the config at `path`, writing it back only when it is missing or
    /// lacks a device identifier. An existing complete file is left untouched.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let (config, needs_save) = Self::parse(&content)?;
            if needs_save {
                config.save_to(path)?;
            }
            config
        } else {
            let config = Config::default();
            config.save_to(path)?;
            config
        };

        if let Some(parent) = PathBuf::from(&config.db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(config)
    }

    /// Parses config text. The flag is set when a freshly generated device
    /// identifier has to be persisted to stay stable across runs.
    fn parse(content: &str) -> Result<(Self, bool)> {
        let table: toml::Table = content.parse()?;
        let config: Config = toml::from_str(content)?;
        Ok((config, !table.contains_key("device_identifier")))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }
}
