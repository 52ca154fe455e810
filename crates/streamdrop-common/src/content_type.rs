//! Extension-based content-type lookup.
//!
//! Used when the ingesting front-end does not report a MIME type. Unknown
//! extensions fall back to `application/octet-stream`.

use std::path::Path;

/// Fallback content type for unrecognized files.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess the MIME type for a file name from its extension.
///
/// # Examples
///
/// ```
/// use streamdrop_common::content_type::content_type_for;
///
/// assert_eq!(content_type_for("movie.MKV"), "video/x-matroska");
/// assert_eq!(content_type_for("notes"), "application/octet-stream");
/// ```
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        // Video
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "ts" | "m2ts" => "video/mp2t",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "3gp" => "video/3gpp",
        // Audio
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        // Documents and archives
        "pdf" => "application/pdf",
        "txt" => "text/plain; charset=utf-8",
        "srt" => "application/x-subrip",
        "vtt" => "text/vtt",
        "zip" => "application/zip",
        "json" => "application/json",
        _ => OCTET_STREAM,
    }
}

/// Pick the content type for a new record: an explicit, non-blank value wins,
/// otherwise the extension lookup decides.
pub fn resolve_content_type(explicit: Option<&str>, file_name: &str) -> String {
    match explicit.map(str::trim) {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => content_type_for(file_name).to_string(),
    }
}
