//! Configuration Management
//!
//! Handles persistent configuration storage for tfetch.

use crate::api::DEFAULT_BASE_URL;
use crate::resource::ResourceKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Host serving the collections
    #[serde(default)]
    pub base_url: Option<String>,
    /// Kind fetched when none is given
    #[serde(default)]
    pub default_kind: Option<ResourceKind>,
    /// Request timeout; absent means wait indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tfetch").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from a specific file; missing or corrupt files yield defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write config {:?}", path))?;

        Ok(())
    }

    /// Get effective base URL (CLI > config > built-in)
    pub fn effective_base_url(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Get effective kind (CLI > config > todos)
    pub fn effective_kind(&self, cli: Option<ResourceKind>) -> ResourceKind {
        cli.or(self.default_kind).unwrap_or(ResourceKind::Todos)
    }

    /// Get effective timeout (CLI > config > none); zero disables the timeout
    pub fn effective_timeout(&self, cli: Option<u64>) -> Option<Duration> {
        cli.or(self.timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Set default kind and save
    pub fn set_default_kind(&mut self, kind: ResourceKind) -> Result<()> {
        self.default_kind = Some(kind);
        self.save()
    }
}
