//! Audit trail routes: paged read, entity timeline, CSV export and download.

use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, TimeDelta, Utc};
use coreops_core::audit::{NewAuditEntry, Severity, action, entity, normalize_reason};
use coreops_core::authz::Scope;
use coreops_core::authz::codes::permissions::{GOV_AUDIT_EXPORT, GOV_AUDIT_READ};
use coreops_core::export::{ExportError, StoredExport, to_csv};
use coreops_core::month_close::RouteGroup;
use coreops_db::entities::audit_logs;
use coreops_db::{AuditFilter, AuditRepository, AuditedTransaction};
use coreops_shared::AppError;
use coreops_shared::types::{PageRequest, PageResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::error::ApiError;
use crate::extractors::{Path, Query, RequestContext, ValidatedJson};
use crate::middleware::{PermissionGate, gated};

/// Route of the download endpoint, as embedded in download URLs.
pub const DOWNLOAD_PATH: &str = "/api/v1/governance/audit/exports/download";

const EXPORT_BASE_NAME: &str = "audit_logs";

const EXPORT_HEADERS: [&str; 14] = [
    "createdAt",
    "requestId",
    "entityType",
    "entityId",
    "action",
    "severity",
    "scope",
    "divisionId",
    "actorId",
    "actorRole",
    "actorEmail",
    "reason",
    "beforeData",
    "afterData",
];

/// Audit log entry as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    /// Entry id.
    pub id: Uuid,
    /// Request that produced the entry.
    pub request_id: String,
    /// Entity type.
    pub entity_type: String,
    /// Entity id.
    pub entity_id: Option<Uuid>,
    /// Action.
    pub action: String,
    /// Severity.
    pub severity: String,
    /// Scope of the change.
    pub scope: Option<String>,
    /// Division of the change.
    pub division_id: Option<Uuid>,
    /// State before.
    pub before_data: Option<Value>,
    /// State after.
    pub after_data: Option<Value>,
    /// Extra context.
    pub meta: Option<Value>,
    /// Acting user.
    pub actor_id: Uuid,
    /// Acting user's primary role.
    pub actor_role: Option<String>,
    /// Acting user's roles at the time.
    pub actor_roles: Option<Value>,
    /// Acting user's email.
    pub actor_email: Option<String>,
    /// Reason given.
    pub reason: Option<String>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl From<audit_logs::Model> for AuditLogResponse {
    fn from(row: audit_logs::Model) -> Self {
        Self {
            id: row.id,
            request_id: row.request_id,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            action: row.action,
            severity: row.severity,
            scope: row.scope,
            division_id: row.division_id,
            before_data: row.before_data,
            after_data: row.after_data,
            meta: row.meta,
            actor_id: row.actor_id,
            actor_role: row.actor_role,
            actor_roles: row.actor_roles,
            actor_email: row.actor_email,
            reason: row.reason,
            created_at: row.created_at.with_timezone(&Utc),
        }
    }
}

/// Body of an export request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    /// Which entries to export.
    #[serde(default)]
    pub filter: AuditFilter,
    /// Why the export is taken. Required.
    #[validate(length(max = 500))]
    #[serde(default)]
    pub reason: String,
}

/// Result of an export.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    /// File name the download will carry.
    pub file_name: String,
    /// Size of the artifact.
    pub size_bytes: u64,
    /// Number of entries written.
    pub row_count: usize,
    /// When the download link stops working.
    pub expires_at: DateTime<Utc>,
    /// Download URL with its capability token.
    pub download_url: String,
}

/// Query of the download endpoint.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Capability token.
    #[serde(default)]
    pub token: String,
}

/// Creates audit routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/audit",
            gated(
                get(list_audit_logs),
                state,
                PermissionGate::any_of(&[GOV_AUDIT_READ, GOV_AUDIT_EXPORT]),
            ),
        )
        .route(
            "/audit/timeline/{entity_type}/{entity_id}",
            gated(get(timeline), state, PermissionGate::require(GOV_AUDIT_READ)),
        )
        .route(
            "/audit/exports",
            gated(
                post(export_audit_logs),
                state,
                PermissionGate::require(GOV_AUDIT_EXPORT),
            ),
        )
        .route("/audit/exports/download", get(download_export))
        .layer(Extension(RouteGroup::Audit))
}

/// Lists audit entries, newest first.
async fn list_audit_logs(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
    Query(filter): Query<AuditFilter>,
) -> Result<Json<PageResponse<AuditLogResponse>>, ApiError> {
    page.validate()?;
    let filter = filter.normalized();

    let (rows, total) = AuditRepository::new(state.db.clone())
        .list(&filter, &page)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "failed to list audit logs"))?;

    let items = rows.into_iter().map(AuditLogResponse::from).collect();
    Ok(Json(PageResponse::for_request(items, &page, total)))
}

/// Every entry of one entity, oldest first.
async fn timeline(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let rows = AuditRepository::new(state.db.clone())
        .timeline(&entity_type, entity_id)
        .await?;

    let entries: Vec<AuditLogResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(json!({
        "entityType": entity_type,
        "entityId": entity_id,
        "entries": entries,
    })))
}

/// Writes matching entries to a CSV artifact and returns a short-lived
/// download link. The export itself is audited; if that audit write fails the
/// artifact is removed and the request fails.
async fn export_audit_logs(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(body): ValidatedJson<ExportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reason = normalize_reason(Some(&body.reason))
        .ok_or_else(|| AppError::Validation("Reason is required".to_string()))?;
    let filter = body.filter.normalized();

    let max_rows = state.settings.export_max_rows;
    let rows = AuditRepository::new(state.db.clone())
        .export(&filter, max_rows.saturating_add(1))
        .await?;
    let row_count = rows.len();
    if u64::try_from(row_count).unwrap_or(u64::MAX) > max_rows {
        return Err(ExportError::TooManyRows { max: max_rows }.into());
    }

    let csv = to_csv(&EXPORT_HEADERS, rows.iter().map(csv_row));
    let stored = state
        .exports
        .store(EXPORT_BASE_NAME, csv.into_bytes())
        .await?;

    match finish_export(&state, &ctx, &filter, &stored, row_count, reason).await {
        Ok(response) => {
            tracing::info!(
                user_id = %ctx.auth.user_id,
                request_id = %ctx.request_id,
                file_name = %stored.file_name,
                row_count,
                "audit log export created"
            );
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(err) => {
            if let Err(e) = state.exports.delete(&stored.rel_path).await {
                tracing::warn!(
                    rel_path = %stored.rel_path,
                    error = %e,
                    "failed to remove export after audit failure"
                );
            }
            Err(err)
        }
    }
}

async fn finish_export(
    state: &AppState,
    ctx: &RequestContext,
    filter: &AuditFilter,
    stored: &StoredExport,
    row_count: usize,
    reason: String,
) -> Result<ExportResponse, ApiError> {
    let expires_at = i64::try_from(state.settings.capability_ttl_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| AppError::internal("capability ttl out of range"))?;
    let token = state.capabilities.issue(
        &stored.rel_path,
        &stored.file_name,
        expires_at.timestamp_millis(),
        Some(ctx.auth.user_id),
    )?;

    let entry = NewAuditEntry::new(
        ctx.request_id.as_str(),
        ctx.actor(),
        entity::AUDIT_LOG,
        action::EXPORT,
    )
    .severity(Severity::High)
    .scoped(Scope::Company, None)
    .after(json!({
        "filter": filter,
        "fileName": stored.file_name,
        "sizeBytes": stored.size_bytes,
        "rowCount": row_count,
    }))
    .reason(reason);

    let mut tx = AuditedTransaction::begin(&state.db, ctx.request_id.as_str()).await?;
    if let Err(e) = tx.audit(entry).await {
        if let Err(rollback) = tx.rollback().await {
            tracing::warn!(error = %rollback, "rollback failed");
        }
        return Err(e.into());
    }
    tx.commit().await?;

    Ok(ExportResponse {
        file_name: stored.file_name.clone(),
        size_bytes: stored.size_bytes,
        row_count,
        expires_at,
        download_url: format!("{DOWNLOAD_PATH}?token={token}"),
    })
}

/// Serves an export artifact to the user its capability was issued to.
///
/// The capability replaces the permission gate for this one action. The
/// path it names must still resolve inside the export root.
async fn download_export(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let token = query.token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("token is required".to_string()).into());
    }

    let grant = state
        .capabilities
        .verify(token, Some(ctx.auth.user_id))
        .inspect_err(|e| {
            tracing::warn!(user_id = %ctx.auth.user_id, error = %e, "download capability rejected");
        })?;

    let contents = state.exports.read(&grant.rel_path).await.inspect_err(|e| {
        tracing::warn!(
            user_id = %ctx.auth.user_id,
            rel_path = %grant.rel_path,
            error = %e,
            "export download refused"
        );
    })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        grant.file_name.replace(['"', '\r', '\n'], "")
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| AppError::internal(format!("invalid content-disposition: {e}")))?;

    tracing::info!(
        user_id = %ctx.auth.user_id,
        file_name = %grant.file_name,
        "audit log export downloaded"
    );

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        contents,
    )
        .into_response())
}

fn csv_row(row: &audit_logs::Model) -> Vec<String> {
    let opt = |v: Option<&str>| v.unwrap_or_default().to_string();
    let json_cell = |v: Option<&Value>| v.map(Value::to_string).unwrap_or_default();

    vec![
        row.created_at.to_rfc3339(),
        row.request_id.clone(),
        row.entity_type.clone(),
        row.entity_id.map(|id| id.to_string()).unwrap_or_default(),
        row.action.clone(),
        row.severity.clone(),
        opt(row.scope.as_deref()),
        row.division_id.map(|id| id.to_string()).unwrap_or_default(),
        row.actor_id.to_string(),
        opt(row.actor_role.as_deref()),
        opt(row.actor_email.as_deref()),
        opt(row.reason.as_deref()),
        json_cell(row.before_data.as_ref()),
        json_cell(row.after_data.as_ref()),
    ]
}
