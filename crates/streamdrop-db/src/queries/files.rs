//! File registry operations: insert, lookup, expiry listing, delete.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode};
use streamdrop_common::time::{format_timestamp, is_storable};
use streamdrop_common::{Error, FileOrigin, Result};

use crate::models::FileRecord;

/// Column list used in SELECT statements. Order matches `FileRecord::from_row`.
const COLS: &str = "id, origin_kind, local_path, remote_url, range_supported, name,
    size, content_type, owner_id, created_at, expires_at";

fn is_duplicate_key(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}

/// Insert a new record.
///
/// Fails with [`Error::Duplicate`] if the ID is already taken and with
/// [`Error::Validation`] if the record has no expiry, expires before it was
/// created, or carries a timestamp outside the fixed-width stored range. The
/// write is committed before this returns.
pub fn insert_file(conn: &Connection, record: &FileRecord) -> Result<()> {
    let expires_at = match record.expires_at {
        Some(t) if !is_storable(t) || !is_storable(record.created_at) => {
            return Err(Error::Validation(format!(
                "record {} has a timestamp outside the storable range",
                record.id
            )))
        }
        Some(t) if t > record.created_at => t,
        Some(_) => {
            return Err(Error::Validation(format!(
                "record {} expires before it was created",
                record.id
            )))
        }
        None => {
            return Err(Error::Validation(format!(
                "record {} has no expiry",
                record.id
            )))
        }
    };

    let size = i64::try_from(record.size)
        .map_err(|_| Error::Validation(format!("size {} out of range", record.size)))?;

    let (local_path, remote_url, range_supported) = match &record.origin {
        FileOrigin::Local { path } => (Some(path.to_string_lossy().into_owned()), None, true),
        FileOrigin::Remote {
            url,
            proxied_range_supported,
        } => (None, Some(url.as_str()), *proxied_range_supported),
    };

    conn.execute(
        "INSERT INTO files (id, origin_kind, local_path, remote_url, range_supported, name,
            size, content_type, owner_id, created_at, expires_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        rusqlite::params![
            record.id.as_str(),
            record.origin.kind().as_str(),
            local_path,
            remote_url,
            range_supported,
            record.name,
            size,
            record.content_type,
            record.owner_id,
            format_timestamp(record.created_at),
            format_timestamp(expires_at),
        ],
    )
    .map_err(|e| {
        if is_duplicate_key(&e) {
            Error::Duplicate(record.id.to_string())
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(())
}

/// Get a record by ID. Expiry is not checked here.
pub fn get_file(conn: &Connection, id: &str) -> Result<FileRecord> {
    let q = format!("SELECT {COLS} FROM files WHERE id = ?1");
    match conn.query_row(&q, [id], FileRecord::from_row) {
        Ok(r) => Ok(r),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(Error::not_found("file", id)),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// All records whose expiry is strictly before `now`, oldest first.
///
/// Rows with an unset expiry sort before every timestamp and are included.
pub fn list_expired(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<FileRecord>> {
    let q = format!("SELECT {COLS} FROM files WHERE expires_at < ?1 ORDER BY expires_at ASC");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([format_timestamp(now)], FileRecord::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// IDs of all expired records, without decoding the rest of the row.
///
/// The sweeper works from this list so that a single malformed row cannot
/// block removal of the others.
pub fn list_expired_ids(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT id FROM files WHERE expires_at < ?1 ORDER BY expires_at ASC")
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([format_timestamp(now)], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Delete a record. Returns whether a row was removed; deleting a missing ID
/// is not an error.
pub fn delete_file(conn: &Connection, id: &str) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM files WHERE id = ?1", [id])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Total number of registered records, live or not.
pub fn count_files(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}

/// Records uploaded by `owner_id`, newest first.
pub fn list_by_owner(conn: &Connection, owner_id: &str) -> Result<Vec<FileRecord>> {
    let q = format!("SELECT {COLS} FROM files WHERE owner_id = ?1 ORDER BY created_at DESC");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([owner_id], FileRecord::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()
    }

    fn local(id: &str, owner: &str, created: DateTime<Utc>, days: i64) -> FileRecord {
        FileRecord::new(
            id.parse().unwrap(),
            FileOrigin::local(format!("{id}/movie.mp4")),
            "movie.mp4",
            1_048_576,
            "video/mp4",
            owner,
            created,
            Duration::days(days),
        )
    }

    #[test]
    fn insert_and_get_round_trip() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let rec = local("AbC12XyZ", "42", at(1), 5);
        insert_file(&conn, &rec).unwrap();
        assert_eq!(get_file(&conn, "AbC12XyZ").unwrap(), rec);

        let remote = FileRecord::new(
            "Remote01".parse().unwrap(),
            FileOrigin::remote("https://cdn.example.com/a.mkv?sig=1", false),
            "a.mkv",
            99,
            "video/x-matroska",
            "7",
            at(2),
            Duration::hours(12),
        );
        insert_file(&conn, &remote).unwrap();
        assert_eq!(get_file(&conn, "Remote01").unwrap(), remote);
    }

    #[test]
    fn missing_id_is_not_found() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let err = get_file(&conn, "Nope1234").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn duplicate_id_rejected() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        insert_file(&conn, &local("AbC12XyZ", "1", at(1), 5)).unwrap();
        let err = insert_file(&conn, &local("AbC12XyZ", "2", at(2), 5)).unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));
        assert_eq!(get_file(&conn, "AbC12XyZ").unwrap().owner_id, "1");
    }

    #[test]
    fn expiry_must_follow_creation() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let zero = local("Zero0000", "1", at(1), 0);
        assert!(matches!(
            insert_file(&conn, &zero).unwrap_err(),
            Error::Validation(_)
        ));

        let unset = FileRecord {
            expires_at: None,
            ..local("Unset000", "1", at(1), 5)
        };
        assert!(matches!(
            insert_file(&conn, &unset).unwrap_err(),
            Error::Validation(_)
        ));
        assert_eq!(count_files(&conn).unwrap(), 0);
    }

    #[test]
    fn far_future_expiry_rejected() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        // +10240-... would sort before every four-digit year
        let far = FileRecord {
            expires_at: Some(Utc.with_ymd_and_hms(10240, 7, 9, 0, 0, 0).unwrap()),
            ..local("FarAway1", "1", at(1), 5)
        };
        assert!(matches!(
            insert_file(&conn, &far).unwrap_err(),
            Error::Validation(_)
        ));
        assert!(list_expired_ids(&conn, at(2)).unwrap().is_empty());
        assert_eq!(count_files(&conn).unwrap(), 0);
    }

    #[test]
    fn delete_is_idempotent() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        insert_file(&conn, &local("AbC12XyZ", "1", at(1), 5)).unwrap();
        assert!(delete_file(&conn, "AbC12XyZ").unwrap());
        assert!(!delete_file(&conn, "AbC12XyZ").unwrap());
        assert!(!delete_file(&conn, "NeverWas").unwrap());
    }

    #[test]
    fn list_expired_uses_strict_bound() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        // expires at(6)
        insert_file(&conn, &local("Expired1", "1", at(1), 5)).unwrap();
        // expires at(12)
        insert_file(&conn, &local("LiveOne1", "1", at(2), 10)).unwrap();

        assert!(list_expired(&conn, at(6)).unwrap().is_empty());

        let expired = list_expired(&conn, at(6) + Duration::milliseconds(1)).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id.as_str(), "Expired1");

        let ids = list_expired_ids(&conn, at(20)).unwrap();
        assert_eq!(ids, vec!["Expired1".to_string(), "LiveOne1".to_string()]);
    }

    #[test]
    fn unset_expiry_is_listed_as_expired() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        conn.execute(
            "INSERT INTO files (id, origin_kind, local_path, name, size, content_type, owner_id, created_at)
             VALUES ('NoExpiry', 'local', 'NoExpiry/x.bin', 'x.bin', 3, 'application/octet-stream', 'o',
                     '2025-03-01T00:00:00.000Z')",
            [],
        )
        .unwrap();

        let ids = list_expired_ids(&conn, at(1)).unwrap();
        assert_eq!(ids, vec!["NoExpiry".to_string()]);

        let rec = get_file(&conn, "NoExpiry").unwrap();
        assert_eq!(rec.expires_at, None);
        assert!(!rec.is_live(at(1)));
    }

    #[test]
    fn malformed_row_still_listed_by_id() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        conn.execute(
            "INSERT INTO files (id, origin_kind, name, size, content_type, owner_id, created_at, expires_at)
             VALUES ('Broken01', 'remote', 'x', 1, 'a/b', 'o', '2025-03-01T00:00:00.000Z',
                     '2025-03-02T00:00:00.000Z')",
            [],
        )
        .unwrap();

        assert!(list_expired(&conn, at(5)).is_err());
        assert_eq!(list_expired_ids(&conn, at(5)).unwrap(), vec!["Broken01".to_string()]);
        assert!(delete_file(&conn, "Broken01").unwrap());
    }

    #[test]
    fn owner_listing_and_count() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        insert_file(&conn, &local("Owner1aa", "alice", at(1), 5)).unwrap();
        insert_file(&conn, &local("Owner1bb", "alice", at(3), 5)).unwrap();
        insert_file(&conn, &local("Owner2aa", "bob", at(2), 5)).unwrap();

        let alice = list_by_owner(&conn, "alice").unwrap();
        let ids: Vec<&str> = alice.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["Owner1bb", "Owner1aa"]);
        assert!(list_by_owner(&conn, "carol").unwrap().is_empty());
        assert_eq!(count_files(&conn).unwrap(), 3);
    }
}
