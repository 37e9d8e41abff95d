use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::endpoint::RenderMode;

/// Top-level Filestore configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilestoreConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listening socket and shutdown settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long, in milliseconds, in-flight requests may keep draining after
    /// the shutdown signal before the stop sequence forces completion.
    #[serde(default = "default_grace")]
    pub grace_ms: u64,
}

/// Where uploaded files land and downloads are served from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_root")]
    pub root: String,
}

/// Structured event-log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging endpoint descriptor, e.g. `file:///dev/stdout` or
    /// `fluent://127.0.0.1:24224/filestore`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Render mode for local stream endpoints. Ignored by fluent endpoints.
    #[serde(default)]
    pub format: RenderMode,
    /// Timestamp events in UTC. Fluent endpoints force UTC regardless.
    #[serde(default = "default_true")]
    pub utc: bool,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_grace() -> u64 {
    1000
}
fn default_storage_root() -> String {
    ".".into()
}
fn default_endpoint() -> String {
    "file:///dev/stdout".into()
}
fn default_true() -> bool {
    true
}

// ── Impls ─────────────────────────────────────────────────────

impl Default for FilestoreConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            grace_ms: default_grace(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            format: RenderMode::default(),
            utc: default_true(),
        }
    }
}

impl FilestoreConfig {
    /// Load configuration from a YAML file + `FILESTORE_` env overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: FilestoreConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("FILESTORE_").split("_"))
            .extract()?;
        Ok(config)
    }
}
