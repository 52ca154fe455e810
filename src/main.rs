mod cli;

use streamdrop::{
    config::{self, Config},
    ingest::{OriginSource, RegisterRequest, Registrar},
    registry::with_conn,
    server::{self, AppContext},
    storage::LocalStore,
    sweeper::ExpirySweeper,
};
use streamdrop_db::pool::{init_pool, DbPool};
use streamdrop_db::queries::files;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Open the registry and the local byte store named in `config`.
fn open_backends(config: &Config) -> Result<(DbPool, LocalStore)> {
    let db_path = &config.database.path;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {:?}", parent))?;
    }

    let db_path_str = db_path.to_string_lossy();
    tracing::info!("Opening registry at {}", db_path_str);
    let db = init_pool(&db_path_str)?;

    let store = LocalStore::new(&config.server.storage_path).with_context(|| {
        format!(
            "Failed to open storage directory {:?}",
            config.server.storage_path
        )
    })?;
    tracing::info!("Storing files under {:?}", store.base_dir());

    Ok((db, store))
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting Streamdrop");
    tracing::info!(
        "Links valid for {} days, public domain {}",
        config.retention.days,
        config.public_domain()
    );

    let (db, store) = open_backends(&config)?;

    // Start expiry sweeper
    let cancel = CancellationToken::new();
    let sweeper = ExpirySweeper::new(
        db.clone(),
        store.clone(),
        Duration::from_secs(config.retention.sweep_interval_secs),
    );
    let sweeper_handle = tokio::spawn(sweeper.run(cancel.clone()));

    let ctx = AppContext::new(config, db, store)?;
    let server_result = server::start_server(ctx).await;

    // Cleanup
    tracing::info!("Shutting down...");
    cancel.cancel();
    if let Err(e) = sweeper_handle.await {
        tracing::warn!("Sweeper task ended abnormally: {}", e);
    }

    server_result
}

async fn run_sweep(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let (db, store) = open_backends(&config)?;

    let sweeper = ExpirySweeper::new(
        db,
        store,
        Duration::from_secs(config.retention.sweep_interval_secs),
    );
    let report = sweeper.sweep_once(chrono::Utc::now()).await?;

    println!("Expired records: {}", report.scanned);
    println!("Deleted: {}", report.deleted);
    if !report.is_clean() {
        println!("Blob delete failures: {}", report.blob_failures);
        println!("Record delete failures: {}", report.record_failures);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn register(
    config_path: Option<&Path>,
    source: String,
    name: Option<String>,
    owner: String,
    content_type: Option<String>,
    retention_days: Option<u32>,
    size: u64,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let (db, store) = open_backends(&config)?;
    let registrar = Registrar::from_config(&config, db, store);

    let is_remote = source.starts_with("http://") || source.starts_with("https://");

    let name = match name {
        Some(n) => n,
        None if is_remote => source
            .split(['?', '#'])
            .next()
            .and_then(|s| s.rsplit('/').next())
            .filter(|s| !s.is_empty())
            .unwrap_or("file")
            .to_string(),
        None => Path::new(&source)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("Source path has no file name; pass --name")?,
    };

    let origin = if is_remote {
        OriginSource::Remote {
            url: source,
            size,
            proxied_range_supported: true,
        }
    } else {
        let path = PathBuf::from(&source);
        if !path.is_file() {
            anyhow::bail!("Source file does not exist: {:?}", path);
        }
        OriginSource::Path(path)
    };

    let (record, links) = registrar
        .register_file(RegisterRequest {
            source: origin,
            name,
            content_type,
            owner_id: owner,
            retention: retention_days.map(|d| chrono::Duration::days(i64::from(d))),
        })
        .await?;

    println!("ID: {}", links.id);
    println!("Expires: {}", links.expires_at.to_rfc3339());
    println!();
    println!("{}", links.summary(&record));

    Ok(())
}

async fn show(config_path: Option<&Path>, id: String) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let (db, store) = open_backends(&config)?;

    let record = with_conn(&db, move |conn| files::get_file(conn, &id)).await?;
    let now = chrono::Utc::now();

    println!("ID: {}", record.id);
    println!("Name: {}", record.name);
    println!("Origin: {}", record.origin.kind());
    println!("Size: {} bytes", record.size);
    println!("Content-Type: {}", record.content_type);
    println!("Owner: {}", record.owner_id);
    println!("Created: {}", record.created_at.to_rfc3339());
    match record.expires_at {
        Some(t) => println!("Expires: {}", t.to_rfc3339()),
        None => println!("Expires: (unset)"),
    }
    println!("Live: {}", record.is_live(now));

    if let Some(links) = Registrar::from_config(&config, db, store).links_for(&record) {
        println!("Stream: {}", links.stream_url);
        println!("Download: {}", links.download_url);
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => println!("Validating config: {:?}", p),
        None => println!("No config file specified, searching default locations"),
    }

    let config = config::load_config_or_default(path)?;
    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Public domain: {}", config.public_domain());
    println!("  Storage: {:?}", config.server.storage_path);
    println!("  Database: {:?}", config.database.path);
    println!("  Retention: {} days", config.retention.days);
    println!("  Sweep interval: {}s", config.retention.sweep_interval_secs);
    println!("  Max file size: {} bytes", config.ingest.max_file_size);

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "streamdrop=debug,streamdrop_db=debug,tower_http=debug".to_string()
        } else {
            "streamdrop=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, config_path))
        }
        Commands::Sweep => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_sweep(config_path))
        }
        Commands::Register {
            source,
            name,
            owner,
            content_type,
            retention_days,
            size,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(register(
                config_path,
                source,
                name,
                owner,
                content_type,
                retention_days,
                size,
            ))
        }
        Commands::Show { id } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(show(config_path, id))
        }
        Commands::Validate => validate_config(config_path),
        Commands::Version => {
            println!("streamdrop {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
