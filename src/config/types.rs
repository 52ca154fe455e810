use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Config {
    /// Host used in share URLs.
    ///
    /// Falls back to `localhost:{port}` when no public domain is configured,
    /// which only makes sense for local testing.
    pub fn public_domain(&self) -> String {
        match self.server.domain.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.trim_end_matches('/').to_string(),
            _ => {
                tracing::warn!(
                    "No public domain configured, share links will use localhost:{}",
                    self.server.port
                );
                format!("localhost:{}", self.server.port)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Public host name used when building share URLs
    #[serde(default)]
    pub domain: Option<String>,

    /// Root directory of the local byte store
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// Timeout for requests to remote origins, in seconds
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_storage_path() -> PathBuf {
    PathBuf::from("./storage")
}
fn default_remote_timeout() -> u64 {
    1800
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            domain: None,
            storage_path: default_storage_path(),
            remote_timeout_secs: default_remote_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/streamdrop.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// How long a link stays valid after registration
    #[serde(default = "default_retention_days")]
    pub days: u32,

    /// Seconds between expiry sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_retention_days() -> u32 {
    5
}
fn default_sweep_interval() -> u64 {
    3600
}

impl RetentionConfig {
    pub fn period(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.days))
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            days: default_retention_days(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Largest file accepted for registration, in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_max_file_size() -> u64 {
    2 * 1024 * 1024 * 1024
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
        }
    }
}
