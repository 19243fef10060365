//! Configuration management for battwatch.
//!
//! Loads settings from `$BATTWATCH_CONFIG` or `<config dir>/battwatch/config.toml`,
//! falls back to defaults, then applies environment overrides
//! (`PORT`, `DATABASE_URL`, `BATTWATCH_ALLOWED_ORIGINS`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "BATTWATCH_CONFIG";

/// HTTP listener and cross-origin policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed to call the API from a browser
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Snapshot store connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `sqlite://<path>`, `sqlite::memory:` or a bare path
    #[serde(default = "default_store_url")]
    pub url: String,
}

fn default_store_url() -> String {
    let dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    format!("sqlite://{}", dir.join("battwatch").join("battery.db").display())
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
        }
    }
}

/// Telemetry source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_power_supply_root")]
    pub power_supply_root: PathBuf,
}

fn default_power_supply_root() -> PathBuf {
    PathBuf::from(crate::source::POWER_SUPPLY_ROOT)
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            power_supply_root: default_power_supply_root(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattwatchConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub source: SourceConfig,
}

impl BattwatchConfig {
    /// Defaults, then the config file if present, then environment overrides
    pub fn load() -> Self {
        let mut config = match config_path() {
            Some(path) if path.exists() => match Self::load_from(&path) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring config {}: {:#}", path.display(), e);
                    Self::default()
                }
            },
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Parse a TOML config file; missing keys take their defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Apply `PORT`, `DATABASE_URL` and `BATTWATCH_ALLOWED_ORIGINS`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid PORT value '{}'", port),
            }
        }

        if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()) {
            self.store.url = url.trim().to_string();
        }

        if let Some(origins) = lookup("BATTWATCH_ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("battwatch").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BattwatchConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.listen_addr(), "0.0.0.0:5000");
        assert!(config.store.url.starts_with("sqlite://"));
        assert!(config.store.url.ends_with("battery.db"));
        assert_eq!(
            config.source.power_supply_root,
            PathBuf::from("/sys/class/power_supply")
        );
        assert!(!config.server.allowed_origins.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = 8080\n").unwrap();

        let config = BattwatchConfig::load_from(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        assert!(BattwatchConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = BattwatchConfig::default();
        config.apply_env(env(&[
            ("PORT", "7000"),
            ("DATABASE_URL", "sqlite::memory:"),
            (
                "BATTWATCH_ALLOWED_ORIGINS",
                "https://dash.example.com, http://localhost:5173,",
            ),
        ]));

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.store.url, "sqlite::memory:");
        assert_eq!(
            config.server.allowed_origins,
            vec!["https://dash.example.com", "http://localhost:5173"]
        );
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let mut config = BattwatchConfig::default();
        config.apply_env(env(&[("PORT", "not-a-port"), ("DATABASE_URL", "  ")]));

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.store, StoreConfig::default());
    }
}
