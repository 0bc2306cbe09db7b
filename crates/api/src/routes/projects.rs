//! Governance project routes.
//!
//! Projects belong to a division, so their routes are division-scoped: a
//! division grant admits only requests for projects of that division.

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use coreops_core::authz::codes::permissions::{GOV_PROJECT_READ, GOV_PROJECT_WRITE};
use coreops_core::month_close::RouteGroup;
use coreops_db::entities::projects;
use coreops_db::{
    AuditedTransaction, CreateProjectInput, ProjectError, ProjectRepository, UpdateProjectInput,
};
use coreops_shared::types::{DivisionId, ProjectId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::error::ApiError;
use crate::extractors::{Path, RequestContext, ValidatedJson};
use crate::middleware::{BodyDivision, PermissionGate, ProjectDivision, gated};

/// Project as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    /// Project id.
    pub id: Uuid,
    /// Owning division.
    pub division_id: Uuid,
    /// Unique code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Active flag.
    pub is_active: bool,
    /// Optimistic version; send it back on update.
    pub version: i32,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<projects::Model> for ProjectResponse {
    fn from(p: projects::Model) -> Self {
        Self {
            id: p.id,
            division_id: p.division_id,
            code: p.code,
            name: p.name,
            is_active: p.is_active,
            version: p.version,
            updated_at: p.updated_at.with_timezone(&Utc),
        }
    }
}

/// Request to create a project.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    /// Owning division.
    pub division_id: Uuid,
    /// Unique code.
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    /// Display name.
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

/// Request to update a project.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    /// Version the caller last read.
    #[validate(range(min = 1))]
    pub version: i32,
    /// New name.
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    /// New active flag.
    pub is_active: Option<bool>,
    /// Why; required when `isActive` changes.
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Creates project routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/projects",
            gated(
                post(create_project),
                state,
                PermissionGate::require(GOV_PROJECT_WRITE).scoped_by(BodyDivision("divisionId")),
            ),
        )
        .route(
            "/projects/{id}",
            gated(
                get(get_project),
                state,
                PermissionGate::require(GOV_PROJECT_READ).scoped_by(ProjectDivision("id")),
            )
            .merge(gated(
                patch(update_project),
                state,
                PermissionGate::require(GOV_PROJECT_WRITE).scoped_by(ProjectDivision("id")),
            )),
        )
        .layer(Extension(RouteGroup::Projects))
}

/// Fetches one project.
async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let id = ProjectId::from_uuid(id);
    let project = ProjectRepository::new(state.db.clone())
        .find(id)
        .await?
        .ok_or(ProjectError::NotFound(id))?;

    Ok(Json(project.into()))
}

/// Creates a project.
async fn create_project(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(body): ValidatedJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = CreateProjectInput {
        division_id: DivisionId::from_uuid(body.division_id),
        code: body.code,
        name: body.name,
    };

    let mut tx = AuditedTransaction::begin(&state.db, ctx.request_id.as_str()).await?;
    let project = match ProjectRepository::create(&mut tx, ctx.actor(), input).await {
        Ok(project) => project,
        Err(e) => return Err(abort(tx, e).await),
    };
    tx.commit().await?;

    tracing::info!(
        project_id = %project.id,
        division_id = %project.division_id,
        user_id = %ctx.auth.user_id,
        "project created"
    );
    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

/// Updates a project if the caller's version is still current.
async fn update_project(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let input = UpdateProjectInput {
        version: body.version,
        name: body.name,
        is_active: body.is_active,
        reason: body.reason,
    };

    let mut tx = AuditedTransaction::begin(&state.db, ctx.request_id.as_str()).await?;
    let project =
        match ProjectRepository::update(&mut tx, ctx.actor(), ProjectId::from_uuid(id), input).await
        {
            Ok(project) => project,
            Err(e) => return Err(abort(tx, e).await),
        };
    tx.commit().await?;

    tracing::info!(
        project_id = %project.id,
        version = project.version,
        user_id = %ctx.auth.user_id,
        "project updated"
    );
    Ok(Json(project.into()))
}

async fn abort(tx: AuditedTransaction, err: ProjectError) -> ApiError {
    if let Err(rollback) = tx.rollback().await {
        tracing::warn!(error = %rollback, "rollback failed");
    }
    if let ProjectError::StaleVersion { current } = &err {
        tracing::info!(current, "stale project version rejected");
    }
    err.into()
}
