//! Configuration Management
//!
//! Handles persistent configuration storage for campus-assets.

use crate::resource::PageWindow;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const BACKEND_URL_ENV: &str = "CAMPUS_ASSETS_BACKEND_URL";

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    10
}

fn default_upload_result_secs() -> u64 {
    10
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL
    #[serde(default)]
    pub backend_url: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Resources per list page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// How long an upload result stays visible
    #[serde(default = "default_upload_result_secs")]
    pub upload_result_secs: u64,
    #[serde(default)]
    pub page_window: PageWindow,
    /// Refuse uploads without a parent department label
    #[serde(default)]
    pub require_parent_department: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
            upload_result_secs: default_upload_result_secs(),
            page_window: PageWindow::default(),
            require_parent_department: false,
        }
    }
}

impl Config {
    /// Directory holding config, session and log files
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("campus-assets"))
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective backend URL (CLI > env > config > default)
    pub fn effective_backend_url(&self, cli: Option<&str>) -> String {
        let env = std::env::var(BACKEND_URL_ENV).ok();
        self.resolve_backend_url(cli, env.as_deref())
    }

    fn resolve_backend_url(&self, cli: Option<&str>, env: Option<&str>) -> String {
        [cli, env, self.backend_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BACKEND_URL)
            .to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn upload_result_display(&self) -> Duration {
        Duration::from_secs(self.upload_result_secs)
    }
}
