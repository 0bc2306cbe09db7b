//! Tests for the audited transaction wrapper against a mock connection.

use coreops_core::audit::{AuditActor, NewAuditEntry, action, entity};
use coreops_shared::AppError;
use coreops_shared::types::UserId;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

use super::*;

fn inserted() -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: 1,
    }
}

fn entry(request_id: &str) -> NewAuditEntry {
    NewAuditEntry::new(
        request_id,
        AuditActor::user(UserId::new()),
        entity::PROJECT,
        action::UPDATE,
    )
}

#[tokio::test]
async fn test_commit_after_audit() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([inserted()])
        .into_connection();

    let mut tx = AuditedTransaction::begin(&db, "req-1").await.unwrap();
    tx.audit(entry("req-1")).await.unwrap();

    assert_eq!(tx.audited(), 1);
    assert!(tx.commit().await.is_ok());
}

#[tokio::test]
async fn test_commit_without_audit_is_refused() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let tx = AuditedTransaction::begin(&db, "req-2").await.unwrap();
    let err = tx.commit().await.unwrap_err();

    assert!(matches!(err, AuditError::Unaudited));
    let app: AppError = err.into();
    assert_eq!(app.status_code(), 500);
}

#[tokio::test]
async fn test_entry_for_other_request_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let mut tx = AuditedTransaction::begin(&db, "req-3").await.unwrap();
    let err = tx.audit(entry("req-4")).await.unwrap_err();

    assert!(matches!(err, AuditError::RequestIdMismatch { .. }));
    assert_eq!(tx.audited(), 0);
}

#[tokio::test]
async fn test_invalid_entry_is_rejected_before_insert() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let mut tx = AuditedTransaction::begin(&db, "req-5").await.unwrap();
    let close = NewAuditEntry::new(
        "req-5",
        AuditActor::user(UserId::new()),
        entity::MONTH_CLOSE,
        action::CLOSE,
    );
    let err = tx.audit(close).await.unwrap_err();

    assert!(matches!(err, AuditError::Invalid(_)));
    let app: AppError = err.into();
    assert_eq!(app.status_code(), 400);
}
