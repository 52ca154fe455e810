//! Error-to-HTTP response conversion for the delivery endpoints.
//!
//! Unknown IDs, expired records, missing blobs and storage failures all
//! produce the same 410 page so a client cannot tell whether an ID ever
//! existed. Storage failures are logged at error level first.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use streamdrop_common::Error;

use super::expired::expired_page;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct DeliveryError {
    inner: Error,
    retention_days: u32,
}

impl DeliveryError {
    pub fn new(inner: Error, retention_days: u32) -> Self {
        Self {
            inner,
            retention_days,
        }
    }

    pub fn inner(&self) -> &Error {
        &self.inner
    }
}

impl IntoResponse for DeliveryError {
    fn into_response(self) -> Response {
        match &self.inner {
            Error::NotFound { .. } | Error::Expired(_) | Error::Validation(_) => {
                tracing::debug!(error = %self.inner, "Serving expired page");
                expired_page(self.retention_days)
            }
            Error::Database { .. } | Error::Io { .. } => {
                tracing::error!(error = %self.inner, "Storage error on read path");
                expired_page(self.retention_days)
            }
            Error::RangeNotSatisfiable { size } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{size}"))],
            )
                .into_response(),
            Error::Upstream { status, message } => {
                tracing::warn!(remote_status = ?status, error = %message, "Bad gateway");
                (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
            }
            Error::Duplicate(_) | Error::RandomSource(_) | Error::Internal(_) => {
                tracing::error!(error = %self.inner, "Server error in delivery handler");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
