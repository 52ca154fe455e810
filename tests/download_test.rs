//! Integration tests for the `/file/{id}` download endpoint, driven through
//! the router with `oneshot`.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Duration;
use common::{payload, TestHarness};
use http_body_util::BodyExt;
use streamdrop_common::time::now_millis;
use tower::ServiceExt;

#[tokio::test]
async fn download_is_an_attachment() {
    let h = TestHarness::new();
    let blob = payload(4096);
    h.insert_local(
        "Dl000001",
        "holiday video.mp4",
        "video/mp4",
        &blob,
        now_millis(),
        Duration::days(5),
    )
    .await;

    let resp = h
        .router()
        .oneshot(Request::get("/file/Dl000001").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"holiday video.mp4\""
    );
    assert_eq!(resp.headers()[header::CONTENT_LENGTH], "4096");
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "video/mp4");

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), blob.as_slice());
}

#[tokio::test]
async fn download_serves_whole_file_despite_range() {
    let h = TestHarness::new();
    let blob = payload(1000);
    h.insert_local(
        "Dl000002",
        "a.bin",
        "application/octet-stream",
        &blob,
        now_millis(),
        Duration::days(5),
    )
    .await;

    let resp = h
        .router()
        .oneshot(
            Request::get("/file/Dl000002")
                .header(header::RANGE, "bytes=2000-3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::CONTENT_RANGE).is_none());
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.len(), 1000);
}

#[tokio::test]
async fn hostile_name_is_sanitized() {
    let h = TestHarness::new();
    h.insert_local("Dl000003", "a\"b\tc.txt", "text/plain", b"hi", now_millis(), Duration::days(5))
        .await;

    let resp = h
        .router()
        .oneshot(Request::get("/file/Dl000003").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"a_b_c.txt\""
    );
}

#[tokio::test]
async fn expired_download_is_gone() {
    let h = TestHarness::new();
    let created = now_millis() - Duration::days(2);
    h.insert_local(
        "Dl000004",
        "a.bin",
        "application/octet-stream",
        b"x",
        created,
        Duration::days(1),
    )
    .await;

    let resp = h
        .router()
        .oneshot(Request::get("/file/Dl000004").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::GONE);
}
