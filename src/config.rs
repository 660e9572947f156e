//! Application configuration persistence
//!
//! Stored in ~/.config/compactd/config.json. Every field is optional in the
//! file; missing ones take their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use compactd::item::Layout;

const DEFAULT_COUNTERS_TTL_SECS: u64 = 30;
const DEFAULT_OVERSCAN_ROWS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// compactd server, e.g. http://localhost:9000
    pub server_url: Option<String>,
    /// Last.fm API key for the metadata commands
    pub lastfm_api_key: Option<String>,
    /// Row layout of the browser
    pub layout: Layout,
    /// How long artist and album counters are cached
    pub counters_ttl_secs: u64,
    /// Rows kept mounted above and below the visible ones
    pub overscan_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            lastfm_api_key: None,
            layout: Layout::Medium,
            counters_ttl_secs: DEFAULT_COUNTERS_TTL_SECS,
            overscan_rows: DEFAULT_OVERSCAN_ROWS,
        }
    }
}

impl AppConfig {
    /// Load the config from disk, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            debug!("No config found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config")
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        debug!("Saved config to {:?}", path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("compactd").join("config.json"))
    }

    pub fn counters_ttl(&self) -> Duration {
        Duration::from_secs(self.counters_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::parse(r#"{"server_url": "http://nas:9000", "layout": "compact"}"#)
            .unwrap();
        assert_eq!(config.server_url.as_deref(), Some("http://nas:9000"));
        assert_eq!(config.layout, Layout::Compact);
        assert_eq!(config.counters_ttl(), Duration::from_secs(30));
        assert_eq!(config.overscan_rows, 4);
    }

    #[test]
    fn test_serialized_round_trip() {
        let config = AppConfig {
            lastfm_api_key: Some("key".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(AppConfig::parse(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_layout_rejected() {
        assert!(AppConfig::parse(r#"{"layout": "huge"}"#).is_err());
    }
}
