//! The page shown for expired or unknown links.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// 410 response explaining that the link is gone and how to get a new one.
pub fn expired_page(retention_days: u32) -> Response {
    let plural = if retention_days == 1 { "" } else { "s" };
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Link Expired</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #f4f4f7; color: #333;
       display: flex; min-height: 100vh; margin: 0; align-items: center; justify-content: center; }}
main {{ background: #fff; border-radius: 12px; padding: 32px; max-width: 460px;
       box-shadow: 0 8px 30px rgba(0, 0, 0, .12); }}
h1 {{ margin-top: 0; }}
p, li {{ color: #555; line-height: 1.5; }}
</style>
</head>
<body>
<main>
<h1>Link Expired</h1>
<p>This link is no longer available. Shared files are deleted automatically {retention_days} day{plural} after upload.</p>
<p>To get a new link:</p>
<ol>
<li>Open the chat you uploaded the file from.</li>
<li>Send or forward the file again.</li>
<li>Use the fresh stream or download link you receive.</li>
</ol>
</main>
</body>
</html>
"#
    );

    (
        StatusCode::GONE,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        html,
    )
        .into_response()
}
