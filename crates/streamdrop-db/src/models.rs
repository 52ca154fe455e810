//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use chrono::{DateTime, Duration, Utc};
use streamdrop_common::time::{checked_expiry, parse_timestamp};
use streamdrop_common::{FileOrigin, OriginKind, ShareId};

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_failure(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, err.into())
}

// ---------------------------------------------------------------------------
// FileRecord
// ---------------------------------------------------------------------------

/// One shareable file and its validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: ShareId,
    pub origin: FileOrigin,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    /// Uploader, kept for audit only.
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    /// `None` when the stored value is missing or unusable; such a record is
    /// never live.
    pub expires_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Build a record that expires `retention` after `created_at`.
    ///
    /// An expiry that cannot be stored leaves `expires_at` unset, which the
    /// registry refuses on insert.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ShareId,
        origin: FileOrigin,
        name: impl Into<String>,
        size: u64,
        content_type: impl Into<String>,
        owner_id: impl Into<String>,
        created_at: DateTime<Utc>,
        retention: Duration,
    ) -> Self {
        Self {
            id,
            origin,
            name: name.into(),
            size,
            content_type: content_type.into(),
            owner_id: owner_id.into(),
            created_at,
            expires_at: checked_expiry(created_at, retention),
        }
    }

    /// A record is live iff `now < expires_at`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => false,
        }
    }

    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let id: String = row.get(0)?;
        let id = ShareId::try_from(id).map_err(|e| conversion_failure(0, e.to_string()))?;

        let kind: String = row.get(1)?;
        let kind: OriginKind = kind.parse().map_err(|e: String| conversion_failure(1, e))?;
        let origin = match kind {
            OriginKind::Local => {
                let path: Option<String> = row.get(2)?;
                let path = path.ok_or_else(|| conversion_failure(2, "local origin without path"))?;
                FileOrigin::local(path)
            }
            OriginKind::Remote => {
                let url: Option<String> = row.get(3)?;
                let url = url.ok_or_else(|| conversion_failure(3, "remote origin without url"))?;
                let range_supported: bool = row.get(4)?;
                FileOrigin::remote(url, range_supported)
            }
        };

        let size: i64 = row.get(6)?;
        let created_at: String = row.get(9)?;
        let expires_at: String = row.get(10)?;

        Ok(Self {
            id,
            origin,
            name: row.get(5)?,
            size: size.max(0) as u64,
            content_type: row.get(7)?,
            owner_id: row.get(8)?,
            created_at: parse_timestamp(&created_at).unwrap_or_default(),
            expires_at: parse_timestamp(&expires_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(expires_at: Option<DateTime<Utc>>) -> FileRecord {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        FileRecord {
            expires_at,
            ..FileRecord::new(
                "AbC12XyZ".parse().unwrap(),
                FileOrigin::local("AbC12XyZ/movie.mp4"),
                "movie.mp4",
                10,
                "video/mp4",
                "42",
                created,
                Duration::days(5),
            )
        }
    }

    #[test]
    fn new_sets_expiry_from_retention() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let r = FileRecord::new(
            "AbC12XyZ".parse().unwrap(),
            FileOrigin::remote("https://cdn.example.com/f", true),
            "clip.webm",
            1,
            "video/webm",
            "7",
            created,
            Duration::hours(36),
        );
        assert_eq!(r.expires_at, Some(created + Duration::hours(36)));
    }

    #[test]
    fn overflowing_retention_leaves_expiry_unset() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let r = record(None);
        let huge = FileRecord::new(
            r.id,
            r.origin,
            r.name,
            r.size,
            r.content_type,
            r.owner_id,
            created,
            Duration::days(1_000_000_000),
        );
        assert_eq!(huge.expires_at, None);
        assert!(!huge.is_live(created));
    }

    #[test]
    fn liveness_boundary() {
        let expires = Utc.with_ymd_and_hms(2025, 3, 6, 0, 0, 0).unwrap();
        let r = record(Some(expires));
        assert!(r.is_live(expires - Duration::seconds(1)));
        assert!(!r.is_live(expires));
        assert!(!r.is_live(expires + Duration::seconds(1)));
    }

    #[test]
    fn missing_expiry_is_never_live() {
        let r = record(None);
        assert!(!r.is_live(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()));
    }
}
