//! Proxying records whose bytes live at a remote URL.

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use streamdrop_common::{Error, FileOrigin, Result};

use super::{attachment_disposition, Origin, ServeMode, ServeRequest};

/// Headers that describe a single connection and must not be relayed.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// A remote response with its body still unread.
pub struct Fetched {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

/// HTTP client for remote origins.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: reqwest::Client,
}

impl RemoteFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// GET `url`, forwarding `range` byte-for-byte if given.
    ///
    /// Only transport failures are errors; any HTTP status is returned as-is.
    /// Dropping the returned body closes the connection.
    pub async fn fetch(&self, url: &str, range: Option<&HeaderValue>) -> Result<Fetched> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(header::RANGE, range.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::upstream(None, e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = Body::from_stream(response.bytes_stream());

        Ok(Fetched {
            status,
            headers,
            body,
        })
    }
}

/// Origin for records hosted by a third party.
#[derive(Debug, Clone)]
pub struct RemoteOrigin {
    fetcher: RemoteFetcher,
}

impl RemoteOrigin {
    pub fn new(fetcher: RemoteFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Origin for RemoteOrigin {
    async fn serve(&self, req: ServeRequest) -> Result<Response> {
        let record = &req.record;
        let FileOrigin::Remote {
            url,
            proxied_range_supported,
        } = &record.origin
        else {
            return Err(Error::Internal(format!("record {} is not remote", record.id)));
        };

        // An origin that mishandles ranges is asked for the whole body.
        let range = req.range.as_ref().filter(|_| *proxied_range_supported);

        let fetched = self.fetcher.fetch(url, range).await.map_err(|e| {
            tracing::warn!(id = %record.id, error = %e, "Remote origin unreachable");
            e
        })?;

        if fetched.status.is_server_error() {
            tracing::warn!(
                id = %record.id,
                status = fetched.status.as_u16(),
                "Remote origin failed"
            );
            return Err(Error::upstream(
                Some(fetched.status.as_u16()),
                format!("remote origin answered {}", fetched.status),
            ));
        }

        let mut headers = HeaderMap::with_capacity(fetched.headers.len());
        for (name, value) in fetched.headers.iter() {
            if !is_hop_by_hop(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        if !headers.contains_key(header::CONTENT_TYPE) {
            if let Ok(ct) = HeaderValue::from_str(&record.content_type) {
                headers.insert(header::CONTENT_TYPE, ct);
            }
        }
        if req.mode == ServeMode::Download {
            headers.insert(
                header::CONTENT_DISPOSITION,
                attachment_disposition(&record.name),
            );
        }

        let mut response = Response::new(fetched.body);
        *response.status_mut() = fetched.status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_headers() {
        assert!(is_hop_by_hop(&header::TRANSFER_ENCODING));
        assert!(is_hop_by_hop(&HeaderName::from_static("keep-alive")));
        assert!(!is_hop_by_hop(&header::CONTENT_RANGE));
        assert!(!is_hop_by_hop(&header::CONTENT_LENGTH));
    }

    #[tokio::test]
    async fn unreachable_origin_is_upstream_error() {
        let fetcher = RemoteFetcher::new(Duration::from_secs(2)).unwrap();
        // port 9 (discard) on loopback is closed in test environments
        let err = fetcher
            .fetch("http://127.0.0.1:9/file", None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Upstream { status: None, .. }));
    }
}
