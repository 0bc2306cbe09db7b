//! Export download capabilities through the full router.

mod common;

use axum::http::{Method, StatusCode, header};
use chrono::{Duration, Utc};
use coreops_shared::types::UserId;
use serde_json::json;

use common::{TestAppBuilder, super_admin};

fn in_ten_minutes() -> i64 {
    (Utc::now() + Duration::minutes(10)).timestamp_millis()
}

#[tokio::test]
async fn test_download_serves_artifact_to_its_owner() {
    let user = UserId::new();
    let app = TestAppBuilder::new().build().await;
    let stored = app
        .exports
        .store("audit_logs", b"id,action\n1,CREATE\n".to_vec())
        .await
        .unwrap();
    let token = app
        .capabilities
        .issue(&stored.rel_path, &stored.file_name, in_ten_minutes(), Some(user))
        .unwrap();

    let (status, headers, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/governance/audit/exports/download?token={token}"),
            Some(user),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION].to_str().unwrap(),
        format!("attachment; filename=\"{}\"", stored.file_name)
    );
    assert_eq!(body, json!("id,action\n1,CREATE\n"));
}

#[tokio::test]
async fn test_download_refuses_other_user() {
    let owner = UserId::new();
    let other = UserId::new();
    let app = TestAppBuilder::new().build().await;
    let stored = app.exports.store("audit_logs", b"x\n".to_vec()).await.unwrap();
    let token = app
        .capabilities
        .issue(&stored.rel_path, &stored.file_name, in_ten_minutes(), Some(owner))
        .unwrap();

    let (status, _, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/governance/audit/exports/download?token={token}"),
            Some(other),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Token not valid for this user");
}

#[tokio::test]
async fn test_download_refuses_expired_token() {
    let user = UserId::new();
    let app = TestAppBuilder::new().build().await;
    let stored = app.exports.store("audit_logs", b"x\n".to_vec()).await.unwrap();
    let expired = (Utc::now() - Duration::seconds(1)).timestamp_millis();
    let token = app
        .capabilities
        .issue(&stored.rel_path, &stored.file_name, expired, Some(user))
        .unwrap();

    let (status, _, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/governance/audit/exports/download?token={token}"),
            Some(user),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Token expired");
}

#[tokio::test]
async fn test_download_refuses_path_outside_export_root() {
    let user = UserId::new();
    let app = TestAppBuilder::new().build().await;
    let token = app
        .capabilities
        .issue("../outside.csv", "outside.csv", in_ten_minutes(), Some(user))
        .unwrap();

    let (status, _, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/governance/audit/exports/download?token={token}"),
            Some(user),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Invalid export path");
}

#[tokio::test]
async fn test_download_requires_token() {
    let user = UserId::new();
    let app = TestAppBuilder::new().build().await;

    let (status, _, body) = app
        .call(
            Method::GET,
            "/api/v1/governance/audit/exports/download",
            Some(user),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "token is required");
}

#[tokio::test]
async fn test_download_requires_authentication() {
    let app = TestAppBuilder::new().build().await;

    let (status, _, _) = app
        .call(
            Method::GET,
            "/api/v1/governance/audit/exports/download?token=abc",
            None,
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_export_requires_reason() {
    let admin = UserId::new();
    let app = TestAppBuilder::new().user(admin, super_admin()).build().await;

    let (status, _, body) = app
        .call(
            Method::POST,
            "/api/v1/governance/audit/exports",
            Some(admin),
            Some(json!({"filter": {"entityType": "PROJECT"}, "reason": "   "})),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Reason is required");
}
