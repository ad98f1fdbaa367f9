//! Configuration system for recall.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RecallError, RecallResult};

/// Greeting sent once per conversation.
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Hello, I'm Recall. I will help you learn new things using spaced repetition technique. \
     Type \"help\" at any time to see what you can do.";

/// Main recall configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    /// SQLite database file. `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,
    /// Catalog file (TOML, JSON or YAML) imported at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
    /// Greeting sent on the first turn of a conversation.
    pub welcome_message: String,
    /// Host the server binds to.
    pub host: String,
    /// Port the server binds to.
    pub port: u16,
}

/// Directory for recall's files, `~/.recall` when a home directory exists.
pub fn recall_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".recall"))
        .unwrap_or_else(|| PathBuf::from(".recall"))
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            database_path: Some(recall_dir().join("recall.db")),
            catalog_path: None,
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl RecallConfig {
    /// A configuration with no files at all (for testing).
    pub fn in_memory() -> Self {
        Self {
            database_path: None,
            ..Default::default()
        }
    }

    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> RecallResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| RecallError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| RecallError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| RecallError::Configuration(e.to_string())),
            _ => Err(RecallError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads:
    /// - `RECALL_CONFIG` (file loaded first, then overridden by the rest)
    /// - `RECALL_DATABASE_PATH` (`:memory:` for an in-memory database)
    /// - `RECALL_CATALOG_PATH`
    /// - `RECALL_WELCOME_MESSAGE`
    /// - `RECALL_HOST`
    /// - `RECALL_PORT`
    pub fn from_env() -> RecallResult<Self> {
        let mut config = match std::env::var("RECALL_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(path) = std::env::var("RECALL_DATABASE_PATH") {
            config.database_path = match path.as_str() {
                ":memory:" => None,
                _ => Some(PathBuf::from(path)),
            };
        }

        if let Ok(path) = std::env::var("RECALL_CATALOG_PATH") {
            config.catalog_path = Some(PathBuf::from(path));
        }

        if let Ok(message) = std::env::var("RECALL_WELCOME_MESSAGE") {
            config.welcome_message = message;
        }

        if let Ok(host) = std::env::var("RECALL_HOST") {
            config.host = host;
        }

        if let Ok(port) = std::env::var("RECALL_PORT") {
            config.port = port.parse().map_err(|_| {
                RecallError::Configuration(format!("RECALL_PORT is not a valid port: {}", port))
            })?;
        }

        Ok(config)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> RecallConfigBuilder {
        RecallConfigBuilder::default()
    }
}

/// Builder for RecallConfig.
#[derive(Default)]
pub struct RecallConfigBuilder {
    config: RecallConfig,
}

impl RecallConfigBuilder {
    /// Set the database file.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    /// Keep all data in memory.
    pub fn in_memory(mut self) -> Self {
        self.config.database_path = None;
        self
    }

    /// Set the catalog file imported at startup.
    pub fn catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.catalog_path = Some(path.into());
        self
    }

    pub fn welcome_message(mut self, message: impl Into<String>) -> Self {
        self.config.welcome_message = message.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RecallConfig {
        self.config
    }
}
