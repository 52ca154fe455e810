//! Registering new files and building their share links.
//!
//! The messaging front-end calls [`Registrar::register_file`] once per
//! upload. The call generates the ID, stores local bytes, and commits the
//! registry row before any URL is built, so a link handed out can always be
//! resolved.

use std::path::PathBuf;

use axum::http::HeaderValue;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use streamdrop_common::content_type::resolve_content_type;
use streamdrop_common::time::{now_millis, MAX_RETENTION_DAYS};
use streamdrop_common::{Error, FileOrigin, Result, ShareId};
use streamdrop_db::models::FileRecord;
use streamdrop_db::pool::DbPool;
use streamdrop_db::queries::files;

use crate::config::Config;
use crate::registry::with_conn;
use crate::storage::{self, LocalStore};

/// Attempts at finding an unused ID before giving up.
const ID_ATTEMPTS: usize = 3;

/// Where a new file's bytes come from.
#[derive(Debug, Clone)]
pub enum OriginSource {
    /// Bytes already in memory, written to the local store.
    Bytes(Bytes),
    /// A file on disk, streamed into the local store.
    Path(PathBuf),
    /// A third-party URL that is proxied on delivery.
    Remote {
        url: String,
        /// Size as reported by the remote, if known.
        size: u64,
        proxied_range_supported: bool,
    },
}

/// One call of [`Registrar::register_file`].
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub source: OriginSource,
    pub name: String,
    /// MIME type reported by the uploader, if any.
    pub content_type: Option<String>,
    pub owner_id: String,
    /// Overrides the configured retention period.
    pub retention: Option<Duration>,
}

/// The public URLs for a registered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    pub id: ShareId,
    pub stream_url: String,
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
}

impl ShareLinks {
    pub fn new(domain: &str, id: ShareId, expires_at: DateTime<Utc>) -> Self {
        Self {
            stream_url: format!("https://{domain}/stream/{id}"),
            download_url: format!("https://{domain}/file/{id}"),
            id,
            expires_at,
        }
    }

    /// The message sent back to the uploader.
    pub fn summary(&self, record: &FileRecord) -> String {
        let days = (self.expires_at - record.created_at).num_days();
        let gib = record.size as f64 / (1024.0 * 1024.0 * 1024.0);
        format!(
            "Stream Ready\n\n\
             Play Online:\n{}\n\n\
             Download:\n{}\n\n\
             Type: {}\n\
             Size: {:.2} GB\n\
             Valid for {} day{}",
            self.stream_url,
            self.download_url,
            record.content_type,
            gib,
            days,
            if days == 1 { "" } else { "s" },
        )
    }
}

/// Creates records and their share links.
#[derive(Debug, Clone)]
pub struct Registrar {
    db: DbPool,
    store: LocalStore,
    domain: String,
    retention: Duration,
    max_file_size: u64,
}

impl Registrar {
    pub fn new(
        db: DbPool,
        store: LocalStore,
        domain: impl Into<String>,
        retention: Duration,
        max_file_size: u64,
    ) -> Self {
        Self {
            db,
            store,
            domain: domain.into(),
            retention,
            max_file_size,
        }
    }

    pub fn from_config(config: &Config, db: DbPool, store: LocalStore) -> Self {
        Self::new(
            db,
            store,
            config.public_domain(),
            config.retention.period(),
            config.ingest.max_file_size,
        )
    }

    /// Links for an existing record.
    pub fn links_for(&self, record: &FileRecord) -> Option<ShareLinks> {
        record
            .expires_at
            .map(|expires_at| ShareLinks::new(&self.domain, record.id.clone(), expires_at))
    }

    /// Register a file and return its record and share links.
    ///
    /// The registry insert is committed before this returns. On any error no
    /// record exists and no bytes are left in the store.
    pub async fn register_file(&self, req: RegisterRequest) -> Result<(FileRecord, ShareLinks)> {
        let name = req.name.trim().to_string();
        storage::check_name(&name)?;

        let retention = req.retention.unwrap_or(self.retention);
        if retention <= Duration::zero() {
            return Err(Error::Validation("retention period must be positive".into()));
        }
        if retention > Duration::days(MAX_RETENTION_DAYS) {
            return Err(Error::Validation(format!(
                "retention period is capped at {MAX_RETENTION_DAYS} days"
            )));
        }

        match &req.source {
            OriginSource::Bytes(bytes) => self.check_size(bytes.len() as u64)?,
            OriginSource::Path(path) => self.check_size(tokio::fs::metadata(path).await?.len())?,
            OriginSource::Remote { url, size, .. } => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(Error::Validation(format!("unsupported remote url: {url}")));
                }
                self.check_size(*size)?;
            }
        }

        // A type that cannot go into a response header would make the link unservable.
        let reported = req
            .content_type
            .as_deref()
            .filter(|ct| HeaderValue::from_str(ct.trim()).is_ok());
        if reported.is_none() && req.content_type.is_some() {
            tracing::debug!(content_type = ?req.content_type, "Ignoring unusable content type");
        }
        let content_type = resolve_content_type(reported, &name);

        let mut attempt = 0;
        let record = loop {
            attempt += 1;
            let id = ShareId::generate()?;

            match self
                .try_register(&req, id, &name, &content_type, retention)
                .await
            {
                Ok(record) => break record,
                Err(Error::Duplicate(id)) if attempt < ID_ATTEMPTS => {
                    tracing::warn!(id = %id, attempt, "Generated id already in use, retrying");
                }
                Err(e) => return Err(e),
            }
        };

        let expires_at = record
            .expires_at
            .ok_or_else(|| Error::Internal(format!("record {} stored without expiry", record.id)))?;
        let links = ShareLinks::new(&self.domain, record.id.clone(), expires_at);

        tracing::info!(
            id = %record.id,
            name = %record.name,
            size = record.size,
            origin = %record.origin.kind(),
            expires_at = %links.expires_at,
            "File registered"
        );

        Ok((record, links))
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_file_size {
            return Err(Error::Validation(format!(
                "file is {size} bytes, limit is {} bytes",
                self.max_file_size
            )));
        }
        Ok(())
    }

    async fn try_register(
        &self,
        req: &RegisterRequest,
        id: ShareId,
        name: &str,
        content_type: &str,
        retention: Duration,
    ) -> Result<FileRecord> {
        let (origin, size, wrote_blob) = match &req.source {
            OriginSource::Remote {
                url,
                size,
                proxied_range_supported,
            } => (
                FileOrigin::remote(url.clone(), *proxied_range_supported),
                *size,
                false,
            ),
            local => {
                self.store.claim(id.as_str()).await?;
                match self.write_local(local, &id, name).await {
                    Ok((key, size)) => (FileOrigin::local(key), size, true),
                    Err(e) => {
                        self.discard(&id).await;
                        return Err(e);
                    }
                }
            }
        };

        let record = FileRecord::new(
            id,
            origin,
            name,
            size,
            content_type,
            req.owner_id.clone(),
            now_millis(),
            retention,
        );

        let row = record.clone();
        if let Err(e) = with_conn(&self.db, move |conn| files::insert_file(conn, &row)).await {
            if wrote_blob {
                self.discard(&record.id).await;
            }
            return Err(e);
        }

        Ok(record)
    }

    async fn write_local(
        &self,
        source: &OriginSource,
        id: &ShareId,
        name: &str,
    ) -> Result<(PathBuf, u64)> {
        match source {
            OriginSource::Bytes(bytes) => {
                let key = self.store.write(id.as_str(), name, bytes).await?;
                Ok((key, bytes.len() as u64))
            }
            OriginSource::Path(path) => {
                let (key, copied) = self.store.write_from_path(id.as_str(), name, path).await?;
                // The source may have grown since it was measured.
                self.check_size(copied)?;
                Ok((key, copied))
            }
            OriginSource::Remote { .. } => {
                Err(Error::Internal("remote source has no local bytes".into()))
            }
        }
    }

    async fn discard(&self, id: &ShareId) {
        if let Err(e) = self.store.delete_all(id.as_str()).await {
            tracing::error!(
                id = %id,
                error = %e,
                "Failed to remove blob after aborted registration"
            );
        }
    }
}
