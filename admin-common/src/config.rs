//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file located by priority:
//! 1. Command-line argument (highest priority)
//! 2. `ADMIN_CONFIG` environment variable
//! 3. User config file (`<config_dir>/boss-admin/config.toml`)
//! 4. Built-in defaults (fallback)
//!
//! A missing file is not fatal: a warning is logged and defaults apply.
//! Secrets are never compiled in; they arrive through the file or through
//! `ADMIN_REST_API_KEY` / `ADMIN_DATABASE_URL`, which override the file.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "ADMIN_CONFIG";
pub const REST_API_KEY_ENV: &str = "ADMIN_REST_API_KEY";
pub const DATABASE_URL_ENV: &str = "ADMIN_DATABASE_URL";

/// Complete bootstrap configuration, constructed once at startup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// HTTP/WebSocket listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Answer websocket text frames with an echo envelope (debug aid)
    #[serde(default)]
    pub echo_client_messages: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            echo_client_messages: false,
        }
    }
}

/// Backing store selection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Direct SQL against a SQLite database
    Sql {
        #[serde(default = "default_database_url")]
        database_url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
    /// PostgREST-compatible REST API of a managed database
    Rest {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sql {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl StoreConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            StoreConfig::Sql { .. } => "sql",
            StoreConfig::Rest { .. } => "rest",
        }
    }

    /// Loggable description; never includes credentials
    pub fn describe(&self) -> String {
        match self {
            StoreConfig::Sql { database_url, max_connections } => {
                format!("sql backend at {} (pool {})", database_url, max_connections)
            }
            StoreConfig::Rest { base_url, api_key } => format!(
                "rest backend at {} (api key {})",
                base_url,
                if api_key.as_deref().is_some_and(|k| !k.is_empty()) { "set" } else { "missing" }
            ),
        }
    }
}

/// Ceilings for outbound store calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Timeouts {
    /// Reads and health probes
    #[serde(default = "default_read_secs")]
    pub read_secs: u64,
    /// Inserts, updates and deletes
    #[serde(default = "default_write_secs")]
    pub write_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read_secs: default_read_secs(),
            write_secs: default_write_secs(),
        }
    }
}

impl Timeouts {
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_database_url() -> String {
    "sqlite://boss-admin.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_read_secs() -> u64 {
    10
}

fn default_write_secs() -> u64 {
    30
}

impl AdminConfig {
    /// Resolve, read, override from environment, and validate
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Self::default()
            }
            None => {
                info!("No config file found, using built-in defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Environment variables take precedence over file values for secrets
    pub fn apply_env_overrides(&mut self) {
        match &mut self.store {
            StoreConfig::Rest { api_key, .. } => {
                if let Some(key) = non_empty_env(REST_API_KEY_ENV) {
                    *api_key = Some(key);
                }
            }
            StoreConfig::Sql { database_url, .. } => {
                if let Some(url) = non_empty_env(DATABASE_URL_ENV) {
                    *database_url = url;
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match &self.store {
            StoreConfig::Sql { database_url, max_connections } => {
                if !database_url.starts_with("sqlite:") {
                    return Err(Error::Config(format!(
                        "database_url must be a sqlite: URL, got {}",
                        database_url
                    )));
                }
                if *max_connections == 0 {
                    return Err(Error::Config("max_connections must be at least 1".into()));
                }
            }
            StoreConfig::Rest { base_url, api_key } => {
                if !crate::validation::is_http_url(base_url) {
                    return Err(Error::Config(format!(
                        "base_url must be an HTTP/HTTPS URL, got {}",
                        base_url
                    )));
                }
                if api_key.as_deref().map_or(true, str::is_empty) {
                    return Err(Error::Config(format!(
                        "rest backend requires an API key (set {} or store.api_key)",
                        REST_API_KEY_ENV
                    )));
                }
            }
        }
        if self.timeouts.read_secs == 0 || self.timeouts.write_secs == 0 {
            return Err(Error::Config("timeouts must be at least 1 second".into()));
        }
        Ok(())
    }
}

/// Config file path by priority; `None` when no candidate applies
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    if let Some(path) = non_empty_env(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    user_config_path().filter(|p| p.exists())
}

/// `<config_dir>/boss-admin/config.toml` for the current platform
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("boss-admin").join("config.toml"))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
