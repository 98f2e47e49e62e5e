//! Configuration module
//!
//! Loads configuration from a TOML file, with `HOST` and `PORT` environment
//! overrides for the listen address.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::pool::DEFAULT_MAX_IDLE;
use crate::store::BackendSettings;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    pub openid: OpenIdConfig,

    #[serde(default)]
    pub coa_store: CoaStoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Identity provider used to verify bearer tokens
#[derive(Debug, Clone, Deserialize)]
pub struct OpenIdConfig {
    /// Issuer URL; discovery is fetched from `{provider}/.well-known/openid-configuration`
    pub provider: String,

    /// Expected token audience
    pub client_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Dynamic library named by `plugin_file`
    #[default]
    Plugin,
    /// In-process store, for development and tests
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoaStoreConfig {
    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default)]
    pub plugin_file: Option<PathBuf>,

    /// Idle repositories kept for reuse
    #[serde(default = "default_max_idle")]
    pub max_idle: usize,

    /// Every other key is handed to the backend factory untouched
    #[serde(flatten)]
    pub settings: BackendSettings,
}

impl Default for CoaStoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            plugin_file: None,
            max_idle: default_max_idle(),
            settings: BackendSettings::new(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_idle() -> usize {
    DEFAULT_MAX_IDLE
}

impl Config {
    /// Read and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HOST` and `PORT` from the environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(env::var("HOST").ok(), env::var("PORT").ok())
    }

    fn apply_overrides(
        &mut self,
        host: Option<String>,
        port: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue("PORT"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.openid.provider.trim().is_empty() {
            return Err(ConfigError::MissingValue("openid.provider"));
        }
        if self.openid.client_id.trim().is_empty() {
            return Err(ConfigError::MissingValue("openid.client_id"));
        }
        if self.coa_store.backend == BackendKind::Plugin && self.coa_store.plugin_file.is_none() {
            return Err(ConfigError::MissingValue("coa_store.plugin_file"));
        }
        if self.coa_store.max_idle == 0 {
            return Err(ConfigError::InvalidValue("coa_store.max_idle"));
        }
        Ok(())
    }

    /// Socket address to listen on
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing configuration value: {0}")]
    MissingValue(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),
}
