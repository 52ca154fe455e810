//! Timestamp helpers.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC with
//! millisecond precision, so lexical order in SQL equals chronological order.

use chrono::{DateTime, Datelike, Duration, SecondsFormat, SubsecRound, Utc};

/// Longest retention period accepted anywhere, in days.
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Last year whose timestamps keep the fixed-width form.
const MAX_STORED_YEAR: i32 = 9999;

/// Render a timestamp in the canonical stored form.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time truncated to the stored precision, so a value read back
/// from the registry compares equal to the one written.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// `start + period`, or `None` if the sum overflows or leaves the range
/// that [`format_timestamp`] renders at fixed width.
pub fn checked_expiry(start: DateTime<Utc>, period: Duration) -> Option<DateTime<Utc>> {
    start
        .checked_add_signed(period)
        .filter(|t| is_storable(*t))
}

/// Whether `ts` renders as a fixed-width stored timestamp.
pub fn is_storable(ts: DateTime<Utc>) -> bool {
    (1..=MAX_STORED_YEAR).contains(&ts.year())
}

/// Parse a stored timestamp.
///
/// Empty strings, unparsable text and values at or before the Unix epoch are
/// all treated as "unset" and yield `None`.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let ts = DateTime::parse_from_rfc3339(s).ok()?.with_timezone(&Utc);
    if ts.timestamp() <= 0 {
        return None;
    }
    Some(ts)
}
