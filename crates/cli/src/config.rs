use proto::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default backend address of the research agent API.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

const APP_DIR: &str = ".research-chat";

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}

/// `~/.research-chat`.
pub fn app_dir() -> PathBuf {
    home_dir().join(APP_DIR)
}

/// Expands a leading `~/` against `$HOME`.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if path == "~" => home_dir(),
        None => PathBuf::from(path),
    }
}

/// Top-level CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Research agent backend.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Where chats are persisted.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL; `/chat/start` and `/chat/resume` are appended.
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Per-request timeout in seconds; `0` waits forever.
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: 0,
        }
    }
}

impl BackendConfig {
    /// Request timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Chat persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON file per storage key. `~/` is expanded.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    format!("~/{APP_DIR}/data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Data directory with `~` expanded.
    pub fn resolved_dir(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }
}

impl Config {
    /// Loads configuration from explicit path, fallback locations, and env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            // Look in current dir, then home dir
            let cwd = std::env::current_dir().ok()?.join("config.toml");
            if cwd.exists() {
                return Some(cwd);
            }
            let home_config = app_dir().join("config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
            None
        });
        debug!(path = ?config_path, "Config file resolved");

        let mut config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(&path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(|e| ConfigError::Toml(e.to_string()))?
        } else {
            Config::default()
        };

        if let Ok(url) = std::env::var("RESEARCH_CHAT_BACKEND_URL") {
            config.backend.url = url;
        }
        if let Ok(secs) = std::env::var("RESEARCH_CHAT_TIMEOUT_SECS") {
            config.backend.timeout_secs =
                secs.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        field: "RESEARCH_CHAT_TIMEOUT_SECS".into(),
                        reason: e.to_string(),
                    })?;
        }
        if let Ok(dir) = std::env::var("RESEARCH_CHAT_DATA_DIR") {
            config.storage.data_dir = dir;
        }

        config.validate()?;
        debug!(
            backend = %config.backend.url,
            timeout = ?config.backend.timeout(),
            data_dir = %config.storage.data_dir,
            "Config loaded"
        );
        Ok(config)
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        let url = self.backend.url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "backend.url".into(),
                reason: "must not be empty".into(),
            });
        }
        self.backend.url = url.to_string();
        if self.storage.data_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.data_dir".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}
