//! Operator credentials for the Telebridge CLI
//!
//! Kept in ~/.config/telebridge/config.toml. `TELEBRIDGE_URL` and
//! `TELEBRIDGE_API_KEY` override the file for one-off runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "telebridge";
const FILE_NAME: &str = "config.toml";
const DEFAULT_URL: &str = "http://localhost:8000";

const URL_ENV: &str = "TELEBRIDGE_URL";
const KEY_ENV: &str = "TELEBRIDGE_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_url(),
            api_key: None,
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("No config directory on this platform")?;
        Ok(base.join(APP_DIR).join(FILE_NAME))
    }

    /// Stored settings with environment overrides applied
    pub fn load() -> Result<Self> {
        let stored = Self::read(&Self::config_path()?)?;
        Ok(stored.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Settings stored at `path`; defaults when the file does not exist yet.
    pub fn read(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text)
                .with_context(|| format!("Invalid config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Cannot read {}", path.display())),
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.write(&path)?;
        Ok(path)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(self).context("Cannot encode config")?;
        fs::write(path, text).with_context(|| format!("Cannot write {}", path.display()))
    }

    fn with_overrides<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = env(URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.set_base_url(&url);
        }
        if let Some(key) = env(KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    pub fn set_base_url(&mut self, url: &str) {
        self.base_url = url.trim().trim_end_matches('/').to_string();
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .with_context(|| format!("Not logged in. Run 'telebridge login' or set {}.", KEY_ENV))
    }
}
