use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::ClientError;
use crate::session::FileSessionStorage;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL all endpoint paths are appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request deadline in seconds; an expired call is a network error
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("vortexia/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Where the token and user identity are persisted
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

fn default_session_path() -> PathBuf {
    FileSessionStorage::default_path()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path).map_err(|e| {
                ClientError::Config(format!(
                    "failed to read config file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Self::parse(&content)?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ClientError> {
        toml::from_str(content)
            .map_err(|e| ClientError::Config(format!("failed to parse configuration: {}", e)))
    }

    /// Apply command-line / environment overrides on top of the file values.
    pub fn with_overrides(mut self, api_url: Option<String>, session_file: Option<PathBuf>) -> Self {
        if let Some(url) = api_url {
            self.api.base_url = url;
        }
        if let Some(path) = session_file {
            self.session.path = path;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let url = reqwest::Url::parse(&self.api.base_url).map_err(|e| {
            ClientError::Config(format!("invalid api.base_url '{}': {}", self.api.base_url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::Config(format!(
                "api.base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ClientError::Config(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
