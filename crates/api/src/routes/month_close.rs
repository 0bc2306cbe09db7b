//! Month-close routes.

use axum::{
    Extension, Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, Utc};
use coreops_core::authz::codes::permissions::{GOV_MONTH_CLOSE_READ, GOV_MONTH_CLOSE_WRITE};
use coreops_core::authz::Scope;
use coreops_core::month_close::{Month, MonthCloseStatus, RouteGroup};
use coreops_db::entities::month_closes;
use coreops_db::{AuditedTransaction, MonthCloseRepository, SetMonthStatusInput};
use coreops_shared::AppError;
use coreops_shared::types::{PageRequest, PageResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::error::ApiError;
use crate::extractors::{Query, RequestContext, ValidatedJson};
use crate::middleware::{PermissionGate, gated};

/// Month-close record as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthCloseResponse {
    /// Record id.
    pub id: Uuid,
    /// First day of the month.
    pub month: NaiveDate,
    /// Scope.
    pub scope: String,
    /// `OPEN` or `CLOSED`.
    pub status: String,
    /// Who closed it.
    pub closed_by: Option<Uuid>,
    /// When it was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Who reopened it.
    pub opened_by: Option<Uuid>,
    /// When it was reopened.
    pub opened_at: Option<DateTime<Utc>>,
    /// Reason given.
    pub reason: String,
}

impl From<month_closes::Model> for MonthCloseResponse {
    fn from(row: month_closes::Model) -> Self {
        Self {
            id: row.id,
            month: row.month,
            scope: row.scope,
            status: row.status,
            closed_by: row.closed_by,
            closed_at: row.closed_at.map(|t| t.with_timezone(&Utc)),
            opened_by: row.opened_by,
            opened_at: row.opened_at.map(|t| t.with_timezone(&Utc)),
            reason: row.reason,
        }
    }
}

/// Request to close or reopen a month.
#[derive(Debug, Deserialize, Validate)]
pub struct SetStatusRequest {
    /// `YYYY-MM` or any date inside the month.
    #[validate(length(min = 7, max = 40))]
    pub month: String,
    /// `COMPANY` (default) or `DIVISION`.
    #[serde(default)]
    pub scope: Option<String>,
    /// `OPEN` or `CLOSED`.
    pub status: String,
    /// Why. Required.
    #[validate(length(max = 500))]
    #[serde(default)]
    pub reason: String,
}

impl SetStatusRequest {
    fn into_input(self) -> Result<SetMonthStatusInput, AppError> {
        let month = Month::parse(&self.month).map_err(|e| AppError::Validation(e.to_string()))?;
        let status: MonthCloseStatus = self
            .status
            .parse()
            .map_err(|_| AppError::Validation("status must be OPEN or CLOSED".to_string()))?;
        let scope = match self.scope.as_deref() {
            None => Scope::Company,
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Validation("scope must be COMPANY or DIVISION".to_string()))?,
        };
        Ok(SetMonthStatusInput {
            month,
            scope,
            status,
            reason: self.reason,
        })
    }
}

/// Creates month-close routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/month-close",
            gated(
                get(list_month_closes),
                state,
                PermissionGate::require(GOV_MONTH_CLOSE_READ),
            ),
        )
        .route(
            "/month-close/status",
            gated(
                post(set_month_status),
                state,
                PermissionGate::require(GOV_MONTH_CLOSE_WRITE),
            ),
        )
        .layer(Extension(RouteGroup::MonthClose))
}

/// Latest record per (month, scope), newest month first.
async fn list_month_closes(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<MonthCloseResponse>>, ApiError> {
    page.validate()?;

    let (rows, total) = MonthCloseRepository::new(state.db.clone())
        .list(&page)
        .await?;

    let items = rows.into_iter().map(MonthCloseResponse::from).collect();
    Ok(Json(PageResponse::for_request(items, &page, total)))
}

/// Closes or reopens a month.
async fn set_month_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(body): ValidatedJson<SetStatusRequest>,
) -> Result<Json<MonthCloseResponse>, ApiError> {
    let input = body.into_input()?;

    let mut tx = AuditedTransaction::begin(&state.db, ctx.request_id.as_str()).await?;
    match MonthCloseRepository::set_status(&mut tx, ctx.actor(), input).await {
        Ok(row) => {
            tx.commit().await?;
            Ok(Json(row.into()))
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "rollback failed");
            }
            Err(e.into())
        }
    }
}
