mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use streamdrop_common::time::MAX_RETENTION_DAYS;

/// Load configuration from a TOML file, then apply environment overrides
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./streamdrop.toml",
        "./config/config.toml",
        "~/.config/streamdrop/config.toml",
        "/etc/streamdrop/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    let mut config = Config::default();
    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_number<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_value(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring {}: {:?} is not a valid number", key, raw);
            None
        }
    }
}

/// Apply container-style environment overrides on top of file settings
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(port) = env_number("PORT") {
        config.server.port = port;
    }
    if let Some(domain) = env_value("DOMAIN").or_else(|| env_value("RAILWAY_PUBLIC_DOMAIN")) {
        config.server.domain = Some(domain);
    }
    if let Some(path) = env_value("STORAGE_PATH") {
        config.server.storage_path = PathBuf::from(path);
    }
    if let Some(path) = env_value("DATABASE_PATH") {
        config.database.path = PathBuf::from(path);
    }
    if let Some(days) = env_number("RETENTION_DAYS") {
        config.retention.days = days;
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.server.remote_timeout_secs == 0 {
        anyhow::bail!("Remote timeout cannot be 0");
    }

    if config.retention.days == 0 {
        anyhow::bail!("Retention period must be at least one day");
    }

    if i64::from(config.retention.days) > MAX_RETENTION_DAYS {
        anyhow::bail!(
            "Retention period cannot exceed {} days",
            MAX_RETENTION_DAYS
        );
    }

    if config.retention.sweep_interval_secs == 0 {
        anyhow::bail!("Sweep interval cannot be 0");
    }

    if config.ingest.max_file_size == 0 {
        anyhow::bail!("Maximum file size cannot be 0");
    }

    if config.server.domain.is_none() {
        tracing::warn!("server.domain is not set; share links will point at localhost");
    }

    Ok(())
}
