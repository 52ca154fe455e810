//! Stream and download endpoints.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::Response,
};
use chrono::Utc;
use streamdrop_common::{Error, Result, ShareId};
use streamdrop_db::models::FileRecord;
use streamdrop_db::queries::files;

use super::error::DeliveryError;
use super::AppContext;
use crate::registry::with_conn;
use crate::streaming::{ServeMode, ServeRequest};

/// `GET /stream/{id}`: inline playback with range support.
pub async fn stream_file(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> std::result::Result<Response, DeliveryError> {
    deliver(&ctx, &id, &headers, ServeMode::Stream).await
}

/// `GET /file/{id}`: attachment download.
pub async fn download_file(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> std::result::Result<Response, DeliveryError> {
    deliver(&ctx, &id, &headers, ServeMode::Download).await
}

async fn deliver(
    ctx: &AppContext,
    id: &str,
    headers: &HeaderMap,
    mode: ServeMode,
) -> std::result::Result<Response, DeliveryError> {
    let fail = |e: Error| DeliveryError::new(e, ctx.config.retention.days);

    let record = lookup_live(ctx, id).await.map_err(fail)?;

    let range = headers.get(header::RANGE).cloned();

    tracing::debug!(
        id = %record.id,
        origin = %record.origin.kind(),
        range = ?range,
        ?mode,
        "Delivering file"
    );

    let origin = ctx.origins.resolve(&record);
    origin
        .serve(ServeRequest {
            record,
            range,
            mode,
        })
        .await
        .map_err(fail)
}

/// Find a record and check that it is live at the time of the request.
async fn lookup_live(ctx: &AppContext, id: &str) -> Result<FileRecord> {
    if !ShareId::is_valid(id) {
        return Err(Error::Validation(format!("malformed id {id:?}")));
    }

    let owned = id.to_string();
    let record = with_conn(&ctx.db, move |conn| files::get_file(conn, &owned)).await?;

    if !record.is_live(Utc::now()) {
        tracing::info!(
            id = %record.id,
            expires_at = ?record.expires_at,
            "Request for expired link"
        );
        return Err(Error::Expired(id.to_string()));
    }

    Ok(record)
}
