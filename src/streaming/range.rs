//! HTTP `Range` header parsing.
//!
//! Supports the `bytes` unit with the three single-range forms:
//! - `bytes=0-499`
//! - `bytes=500-` (to end of file)
//! - `bytes=-500` (last 500 bytes)
//!
//! A header with several comma-separated ranges yields every satisfiable one
//! in order. Delivery only serves the first as a single-part 206; there is no
//! `multipart/byteranges` support.

/// An inclusive byte range already checked against the file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` header of a 206 response.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// Parse a `Range` header against a file of `size` bytes.
///
/// Unparsable or unsatisfiable parts are skipped. An empty result means the
/// request should be answered with 416.
pub fn parse_ranges(header: &str, size: u64) -> Vec<ByteRange> {
    let Some(set) = header.trim().strip_prefix("bytes=") else {
        return Vec::new();
    };

    set.split(',')
        .filter_map(|part| parse_one(part.trim(), size))
        .collect()
}

/// First satisfiable range in `header`, if any.
pub fn first_range(header: &str, size: u64) -> Option<ByteRange> {
    parse_ranges(header, size).into_iter().next()
}

fn parse_one(part: &str, size: u64) -> Option<ByteRange> {
    let (start, end) = part.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        // bytes=-500
        (true, false) => {
            let suffix: u64 = end.parse().ok()?;
            if suffix == 0 || size == 0 {
                return None;
            }
            Some(ByteRange {
                start: size.saturating_sub(suffix),
                end: size - 1,
            })
        }
        // bytes=500-
        (false, true) => {
            let start: u64 = start.parse().ok()?;
            if start >= size {
                return None;
            }
            Some(ByteRange {
                start,
                end: size - 1,
            })
        }
        // bytes=0-499
        (false, false) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            if start > end || start >= size {
                return None;
            }
            Some(ByteRange {
                start,
                end: end.min(size - 1),
            })
        }
        // bytes=-
        (true, true) => None,
    }
}
