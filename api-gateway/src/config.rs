//! Application configuration
//!
//! Values come from the environment (after `.env` is loaded) and may be
//! overridden by a JSON file:
//!
//! ```json
//! { "port": 8080, "storage": { "type": "in-memory" } }
//! ```

use std::env;
use std::fs;
use std::path::Path;

use account_service::RepositoryType;
use common::error::{Error, ErrorExt, Result};
use serde::Deserialize;
use tracing::info;

/// Environment variable naming the JSON configuration file
pub const CONFIG_FILE_ENV: &str = "LEDGER_CONFIG";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interface to bind
    pub host: String,
    /// API port
    pub port: u16,
    /// Account storage backend
    pub storage: RepositoryType,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    storage: Option<StorageSection>,
}

#[derive(Debug, Default, Deserialize)]
struct StorageSection {
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    /// Create a new configuration from environment variables
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            storage: env::var("STORAGE_TYPE")
                .map(|v| RepositoryType::from_setting(&v))
                .unwrap_or(RepositoryType::InMemory),
        }
    }

    /// Environment configuration, overridden by the JSON file at `path` or,
    /// when no path is given, the file named by `LEDGER_CONFIG` if set.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::new();

        let from_env = env::var(CONFIG_FILE_ENV).ok();
        let path = path.or_else(|| from_env.as_deref().map(Path::new));
        if let Some(path) = path {
            let contents = fs::read_to_string(path)
                .map_err(|e| Error::ConfigurationError(e.to_string()))
                .with_context(|| format!("Cannot read {}", path.display()))?;
            config.apply_json(&contents)?;
            info!("Loaded configuration from {}", path.display());
        }

        Ok(config)
    }

    /// Apply overrides from a JSON document
    pub fn apply_json(&mut self, contents: &str) -> Result<()> {
        let file: FileConfig = serde_json::from_str(contents)?;

        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(kind) = file.storage.and_then(|s| s.kind) {
            self.storage = RepositoryType::from_setting(&kind);
        }
        Ok(())
    }

    /// `host:port` to listen on
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
