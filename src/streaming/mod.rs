//! Content origins and byte delivery.
//!
//! A record's [`FileOrigin`] is resolved once per request to an [`Origin`]
//! implementation, which turns the request into a streaming response:
//!
//! - **Local**: bytes from the [`LocalStore`](crate::storage::LocalStore),
//!   with range requests answered here.
//! - **Remote**: bytes proxied from a third-party URL; the client's `Range`
//!   header is forwarded and the remote's answer relayed.

mod local;
pub mod range;
mod remote;

pub use local::LocalOrigin;
pub use range::{first_range, parse_ranges, ByteRange};
pub use remote::{Fetched, RemoteFetcher, RemoteOrigin};

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderValue;
use axum::response::Response;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use streamdrop_common::{FileOrigin, Result};
use streamdrop_db::models::FileRecord;

/// Which endpoint a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    /// Inline playback with range support.
    Stream,
    /// Attachment download; local files are always sent whole.
    Download,
}

/// Everything an origin needs to answer one request.
#[derive(Debug, Clone)]
pub struct ServeRequest {
    pub record: FileRecord,
    /// `Range` header exactly as the client sent it.
    pub range: Option<HeaderValue>,
    pub mode: ServeMode,
}

/// A source of bytes for a record.
#[async_trait]
pub trait Origin: Send + Sync {
    async fn serve(&self, req: ServeRequest) -> Result<Response>;
}

/// The two origin implementations, picked per record.
#[derive(Clone)]
pub struct Origins {
    local: Arc<dyn Origin>,
    remote: Arc<dyn Origin>,
}

impl Origins {
    pub fn new(local: Arc<dyn Origin>, remote: Arc<dyn Origin>) -> Self {
        Self { local, remote }
    }

    /// Origin that serves `record`.
    pub fn resolve(&self, record: &FileRecord) -> Arc<dyn Origin> {
        match record.origin {
            FileOrigin::Local { .. } => Arc::clone(&self.local),
            FileOrigin::Remote { .. } => Arc::clone(&self.remote),
        }
    }
}

/// `Content-Disposition` value for downloading `name` as an attachment.
///
/// The quoted `filename` is reduced to printable ASCII with quotes,
/// backslashes and control characters replaced; non-ASCII names also get an
/// RFC 5987 `filename*`.
pub fn attachment_disposition(name: &str) -> HeaderValue {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_control() => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    let value = if name.is_ascii() {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        let encoded = utf8_percent_encode(name, NON_ALPHANUMERIC);
        format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
