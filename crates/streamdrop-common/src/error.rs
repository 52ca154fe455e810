//! Common error types used throughout streamdrop.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for the delivery layer to pick an HTTP outcome via
//! [`Error::http_status`].

use std::fmt;

/// Unified error type covering registry, storage, ingestion and delivery.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "file", "blob").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The record exists but its retention window has passed.
    #[error("Link expired: {0}")]
    Expired(String),

    /// A record with the same ID is already registered.
    #[error("Duplicate id: {0}")]
    Duplicate(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The client asked for a byte range the file cannot satisfy.
    #[error("Range not satisfiable for {size} byte file")]
    RangeNotSatisfiable {
        /// Length of the file the range was checked against.
        size: u64,
    },

    /// The OS random source could not produce bytes.
    #[error("Random source error: {0}")]
    RandomSource(String),

    /// A remote origin failed or could not be reached.
    #[error("Upstream error{}: {message}", status.map(|s| format!(" [{s}]")).unwrap_or_default())]
    Upstream {
        /// Status returned by the remote, if it answered at all.
        status: Option<u16>,
        /// Human-readable error description.
        message: String,
    },

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an HTTP status code.
    ///
    /// Missing and expired links share 410 so callers cannot tell them apart.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 410,
            Error::Expired(_) => 410,
            Error::Duplicate(_) => 409,
            Error::Validation(_) => 400,
            Error::RangeNotSatisfiable { .. } => 416,
            Error::RandomSource(_) => 500,
            Error::Upstream { .. } => 502,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Upstream`].
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Upstream {
            status,
            message: message.into(),
        }
    }

    /// True for storage-layer failures (database or filesystem).
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Database { .. } | Error::Io { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
