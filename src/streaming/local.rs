//! Serving blobs from the local byte store.

use std::io::SeekFrom;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use streamdrop_common::content_type::OCTET_STREAM;
use streamdrop_common::{Error, FileOrigin, Result};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::{attachment_disposition, range, Origin, ServeMode, ServeRequest};
use crate::storage::LocalStore;

/// Origin for records whose bytes live in the local store.
#[derive(Debug, Clone)]
pub struct LocalOrigin {
    store: LocalStore,
}

impl LocalOrigin {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Origin for LocalOrigin {
    async fn serve(&self, req: ServeRequest) -> Result<Response> {
        let record = &req.record;
        let FileOrigin::Local { path } = &record.origin else {
            return Err(Error::Internal(format!(
                "record {} is not stored locally",
                record.id
            )));
        };

        let (mut file, on_disk) = self.store.open_key(path).await?;
        if on_disk != record.size {
            tracing::error!(
                id = %record.id,
                expected = record.size,
                actual = on_disk,
                "Stored blob length does not match record"
            );
            return Err(Error::not_found("blob", &record.id));
        }
        let size = record.size;

        let content_type = HeaderValue::from_str(&record.content_type).unwrap_or_else(|_| {
            tracing::warn!(id = %record.id, "Stored content type is not a valid header value");
            HeaderValue::from_static(OCTET_STREAM)
        });
        let builder = Response::builder().header(header::CONTENT_TYPE, content_type);

        if req.mode == ServeMode::Download {
            let body = Body::from_stream(ReaderStream::new(file));
            return builder
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, size.to_string())
                .header(header::CONTENT_DISPOSITION, attachment_disposition(&record.name))
                .body(body)
                .map_err(|e| Error::Internal(e.to_string()));
        }

        match req.range.as_ref() {
            Some(raw) => {
                // Not valid text, so no range in it can be satisfied.
                let header_value = raw.to_str().unwrap_or_default();
                let Some(r) = range::first_range(header_value, size) else {
                    tracing::debug!(id = %record.id, range = header_value, "Unsatisfiable range");
                    return Err(Error::RangeNotSatisfiable { size });
                };

                file.seek(SeekFrom::Start(r.start)).await?;
                let body = Body::from_stream(ReaderStream::new(file.take(r.length())));

                builder
                    .status(StatusCode::PARTIAL_CONTENT)
                    .header(header::CONTENT_LENGTH, r.length().to_string())
                    .header(header::CONTENT_RANGE, r.content_range(size))
                    .header(header::ACCEPT_RANGES, "bytes")
                    .body(body)
                    .map_err(|e| Error::Internal(e.to_string()))
            }
            None => {
                let body = Body::from_stream(ReaderStream::new(file));
                builder
                    .status(StatusCode::OK)
                    .header(header::CONTENT_LENGTH, size.to_string())
                    .header(header::ACCEPT_RANGES, "bytes")
                    .body(body)
                    .map_err(|e| Error::Internal(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use streamdrop_db::models::FileRecord;

    async fn setup(size: usize) -> (tempfile::TempDir, LocalOrigin, FileRecord) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        let bytes: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let key = store.write("AbC12XyZ", "clip.mp4", &bytes).await.unwrap();
        let record = FileRecord::new(
            "AbC12XyZ".parse().unwrap(),
            FileOrigin::local(key),
            "clip.mp4",
            size as u64,
            "video/mp4",
            "1",
            Utc::now(),
            Duration::days(1),
        );
        (dir, LocalOrigin::new(store), record)
    }

    fn request(record: &FileRecord, range: Option<&'static str>, mode: ServeMode) -> ServeRequest {
        ServeRequest {
            record: record.clone(),
            range: range.map(HeaderValue::from_static),
            mode,
        }
    }

    #[tokio::test]
    async fn suffix_range() {
        let (_dir, origin, record) = setup(1000).await;
        let resp = origin
            .serve(request(&record, Some("bytes=-50"), ServeMode::Stream))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()[header::CONTENT_RANGE], "bytes 950-999/1000");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.len(), 50);
        assert_eq!(body[0], (950 % 251) as u8);
    }

    #[tokio::test]
    async fn bad_range_is_416() {
        let (_dir, origin, record) = setup(1000).await;
        let err = origin
            .serve(request(&record, Some("bytes=2000-3000"), ServeMode::Stream))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RangeNotSatisfiable { size: 1000 }));
    }

    #[tokio::test]
    async fn non_text_range_is_416() {
        let (_dir, origin, record) = setup(1000).await;
        let req = ServeRequest {
            record: record.clone(),
            range: Some(HeaderValue::from_bytes(b"bytes=0-9\xff").unwrap()),
            mode: ServeMode::Stream,
        };
        let err = origin.serve(req).await.unwrap_err();
        assert!(matches!(err, Error::RangeNotSatisfiable { size: 1000 }));
    }

    #[tokio::test]
    async fn download_ignores_range() {
        let (_dir, origin, record) = setup(1000).await;
        let resp = origin
            .serve(request(&record, Some("bytes=0-9"), ServeMode::Download))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_LENGTH], "1000");
        assert!(resp.headers().get(header::CONTENT_RANGE).is_none());
    }

    #[tokio::test]
    async fn unusable_content_type_falls_back_to_octet_stream() {
        let (_dir, origin, mut record) = setup(10).await;
        record.content_type = "video/mp4\u{1}".into();
        let resp = origin
            .serve(request(&record, None, ServeMode::Stream))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], OCTET_STREAM);
    }

    #[tokio::test]
    async fn size_mismatch_is_treated_as_missing() {
        let (_dir, origin, mut record) = setup(1000).await;
        record.size = 2000;
        let err = origin
            .serve(request(&record, None, ServeMode::Stream))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
