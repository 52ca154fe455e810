//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory registry, a temporary
//! byte store, default config and the full [`AppContext`]. The
//! [`TestHarness::with_server`] constructor starts Axum on a random port for
//! HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Router;
use chrono::{DateTime, Duration, Utc};
use streamdrop::config::Config;
use streamdrop::ingest::Registrar;
use streamdrop::server::{create_router, AppContext};
use streamdrop::storage::LocalStore;
use streamdrop::sweeper::ExpirySweeper;
use streamdrop_common::time::now_millis;
use streamdrop_common::FileOrigin;
use streamdrop_db::models::FileRecord;
use streamdrop_db::pool::{init_memory_pool, DbPool};
use streamdrop_db::queries::files;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database and a temporary storage directory.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub store: LocalStore,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        let mut config = Config::default();
        config.server.domain = Some("files.example.com".into());
        Self::with_config(config)
    }

    /// Create a new harness with a custom configuration.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.server.storage_path = dir.path().join("storage");

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let store = LocalStore::new(&config.server.storage_path).expect("failed to open store");
        let ctx = AppContext::new(config, db.clone(), store.clone())
            .expect("failed to build app context");

        Self {
            ctx,
            db,
            store,
            _dir: dir,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let addr = serve(harness.router()).await;
        (harness, addr)
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    pub fn registrar(&self) -> Registrar {
        Registrar::from_config(&self.ctx.config, self.db.clone(), self.store.clone())
    }

    pub fn sweeper(&self) -> ExpirySweeper {
        ExpirySweeper::new(
            self.db.clone(),
            self.store.clone(),
            std::time::Duration::from_secs(3600),
        )
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> streamdrop_db::pool::PooledConnection {
        streamdrop_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Write `bytes` to the store and register a local record for them.
    pub async fn insert_local(
        &self,
        id: &str,
        name: &str,
        content_type: &str,
        bytes: &[u8],
        created_at: DateTime<Utc>,
        retention: Duration,
    ) -> FileRecord {
        let key = self
            .store
            .write(id, name, bytes)
            .await
            .expect("failed to write blob");
        let record = FileRecord::new(
            id.parse().expect("bad test id"),
            FileOrigin::local(key),
            name,
            bytes.len() as u64,
            content_type,
            "tester",
            created_at,
            retention,
        );
        files::insert_file(&self.conn(), &record).expect("failed to insert record");
        record
    }

    /// Register a live remote record pointing at `url`.
    pub fn insert_remote(
        &self,
        id: &str,
        name: &str,
        content_type: &str,
        url: &str,
        proxied_range_supported: bool,
    ) -> FileRecord {
        let record = FileRecord::new(
            id.parse().expect("bad test id"),
            FileOrigin::remote(url, proxied_range_supported),
            name,
            0,
            content_type,
            "tester",
            now_millis(),
            Duration::days(5),
        );
        files::insert_file(&self.conn(), &record).expect("failed to insert record");
        record
    }
}

/// Serve `app` on a random loopback port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind random port");
    let addr = listener.local_addr().expect("failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    addr
}

/// Deterministic test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}
