//! Service configuration
//!
//! This module handles loading and validating the process configuration from
//! environment variables, a TOML file and command-line arguments. It is
//! distinct from the redirect configuration document, which the service
//! itself edits at runtime.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scheduler::SchedulerConfig;

/// Prefix shared by all environment variables
pub const ENV_PREFIX: &str = "EZ_REDIRECT_";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Document storage configuration
    pub storage: StorageConfig,

    /// Background scheduler configuration
    pub scheduler: SchedulerConfig,

    /// Remote API client configuration
    pub remote: RemoteApiConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port override; the port stored in the redirect document otherwise
    pub port: Option<u16>,

    /// Allow cross-origin requests from any origin
    pub enable_cors: bool,

    /// Trace every HTTP request
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: None,
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

/// Document storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding config.json and presets.json
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Remote API client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteApiConfig {
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for RemoteApiConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: Option<String>) -> Result<Option<T>> {
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("Invalid value for {ENV_PREFIX}{name}: '{raw}'")),
        None => Ok(None),
    }
}

fn parse_bool(name: &str, value: Option<String>) -> Result<Option<bool>> {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(None),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => anyhow::bail!("Invalid value for {ENV_PREFIX}{name}: '{v}'"),
        },
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
    }

    /// Build a configuration from defaults overridden by `lookup`
    ///
    /// `lookup` receives variable names without the prefix.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_var("PORT", lookup("PORT"))? {
            config.server.port = Some(port);
        }
        if let Some(cors) = parse_bool("CORS", lookup("CORS"))? {
            config.server.enable_cors = cors;
        }
        if let Some(logging) = parse_bool("REQUEST_LOGGING", lookup("REQUEST_LOGGING"))? {
            config.server.enable_request_logging = logging;
        }
        if let Some(dir) = lookup("DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(enabled) = parse_bool("SCHEDULER_ENABLED", lookup("SCHEDULER_ENABLED"))? {
            config.scheduler.enabled = enabled;
        }
        if let Some(secs) = parse_var("POLL_INTERVAL", lookup("POLL_INTERVAL"))? {
            config.scheduler.poll_interval_secs = secs;
        }
        if let Some(secs) = parse_var("REQUEST_TIMEOUT", lookup("REQUEST_TIMEOUT"))? {
            config.remote.request_timeout_secs = secs;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.server
            .host
            .parse::<IpAddr>()
            .with_context(|| format!("Invalid server host '{}'", self.server.host))?;

        if let Some(port) = self.server.port {
            if port < crate::models::MIN_PORT {
                anyhow::bail!("port must be between {} and 65535", crate::models::MIN_PORT);
            }
        }

        self.scheduler.validate()?;

        if self.remote.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// Address to listen on given the port stored in the redirect document
    pub fn bind_address(&self, stored_port: u16) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid server host '{}'", self.server.host))?;
        Ok(SocketAddr::new(ip, self.server.port.unwrap_or(stored_port)))
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.request_timeout_secs)
    }
}
