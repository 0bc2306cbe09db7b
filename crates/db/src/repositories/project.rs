//! Governance project repository.
//!
//! Projects carry an optimistic version counter: an update names the version
//! it was based on, and a stale version is a conflict rather than a silent
//! overwrite.

use chrono::Utc;
use coreops_core::audit::{AuditActor, NewAuditEntry, action, entity};
use coreops_core::authz::Scope;
use coreops_shared::AppError;
use coreops_shared::types::{DivisionId, ProjectId};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    Set, sea_query::Expr,
};
use serde_json::{Value, json};

use crate::audit::AuditError;
use crate::entities::{divisions, projects};
use crate::transaction::AuditedTransaction;

/// Error types for project operations.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// Project not found.
    #[error("Project not found: {0}")]
    NotFound(ProjectId),

    /// Division referenced by the project does not exist.
    #[error("Division not found: {0}")]
    DivisionNotFound(DivisionId),

    /// Project code already in use.
    #[error("Project code '{0}' already exists")]
    DuplicateCode(String),

    /// Update based on an outdated version.
    #[error("Project was modified by someone else (current version {current})")]
    StaleVersion {
        /// Version currently stored.
        current: i32,
    },

    /// Audit trail error.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ProjectError> for AppError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::NotFound(_) => Self::NotFound(err.to_string()),
            ProjectError::DivisionNotFound(_) => Self::Validation(err.to_string()),
            ProjectError::DuplicateCode(_) | ProjectError::StaleVersion { .. } => {
                Self::Conflict(err.to_string())
            }
            ProjectError::Audit(e) => e.into(),
            ProjectError::Database(e) => Self::database(e),
        }
    }
}

/// Input for creating a project.
#[derive(Debug, Clone)]
pub struct CreateProjectInput {
    /// Owning division.
    pub division_id: DivisionId,
    /// Unique code.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// Input for updating a project.
#[derive(Debug, Clone, Default)]
pub struct UpdateProjectInput {
    /// Version the caller last read.
    pub version: i32,
    /// New name.
    pub name: Option<String>,
    /// New active flag.
    pub is_active: Option<bool>,
    /// Why; required when the active flag changes.
    pub reason: Option<String>,
}

/// Project repository.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    db: DatabaseConnection,
}

impl ProjectRepository {
    /// Creates a new project repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a project by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, id: ProjectId) -> Result<Option<projects::Model>, DbErr> {
        projects::Entity::find_by_id(id.into_inner()).one(&self.db).await
    }

    /// Division that owns project `id`, if the project exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn division_of(&self, id: ProjectId) -> Result<Option<DivisionId>, DbErr> {
        let project = self.find(id).await?;
        Ok(project.map(|p| DivisionId::from_uuid(p.division_id)))
    }

    /// Creates a project and its audit entry inside `tx`.
    ///
    /// # Errors
    ///
    /// Returns an error if the division is unknown, the code is taken, or a
    /// write fails.
    pub async fn create(
        tx: &mut AuditedTransaction,
        actor: AuditActor,
        input: CreateProjectInput,
    ) -> Result<projects::Model, ProjectError> {
        let division = divisions::Entity::find_by_id(input.division_id.into_inner())
            .one(tx.transaction())
            .await?;
        if division.is_none() {
            return Err(ProjectError::DivisionNotFound(input.division_id));
        }

        let code = input.code.trim().to_string();
        let taken = projects::Entity::find()
            .filter(projects::Column::Code.eq(code.clone()))
            .one(tx.transaction())
            .await?;
        if taken.is_some() {
            return Err(ProjectError::DuplicateCode(code));
        }

        let now = Utc::now().into();
        let actor_id = actor.id.into_inner();
        let project = projects::ActiveModel {
            id: Set(ProjectId::new().into_inner()),
            division_id: Set(input.division_id.into_inner()),
            code: Set(code),
            name: Set(input.name.trim().to_string()),
            is_active: Set(true),
            version: Set(1),
            created_at: Set(now),
            created_by: Set(Some(actor_id)),
            updated_at: Set(now),
            updated_by: Set(Some(actor_id)),
        }
        .insert(tx.transaction())
        .await?;

        let entry = NewAuditEntry::new(tx.request_id(), actor, entity::PROJECT, action::CREATE)
            .entity(project.id)
            .scoped(Scope::Division, Some(input.division_id))
            .after(snapshot(&project));
        tx.audit(entry).await?;

        Ok(project)
    }

    /// Applies `input` if the stored version still equals `input.version`,
    /// bumping the version, and audits the change inside `tx`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `StaleVersion`, an audit validation error (a
    /// status change without reason), or a database error.
    pub async fn update(
        tx: &mut AuditedTransaction,
        actor: AuditActor,
        id: ProjectId,
        input: UpdateProjectInput,
    ) -> Result<projects::Model, ProjectError> {
        let before = projects::Entity::find_by_id(id.into_inner())
            .one(tx.transaction())
            .await?
            .ok_or(ProjectError::NotFound(id))?;

        if before.version != input.version {
            return Err(ProjectError::StaleVersion {
                current: before.version,
            });
        }

        let status_change = input
            .is_active
            .is_some_and(|active| active != before.is_active);
        let audit_action = if status_change {
            action::STATUS_CHANGE
        } else {
            action::UPDATE
        };

        let actor_id = actor.id.into_inner();
        let mut entry = NewAuditEntry::new(tx.request_id(), actor, entity::PROJECT, audit_action)
            .entity(before.id)
            .scoped(Scope::Division, Some(DivisionId::from_uuid(before.division_id)))
            .before(snapshot(&before));
        if let Some(reason) = &input.reason {
            entry = entry.reason(reason.clone());
        }
        entry.validate().map_err(AuditError::from)?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut update = projects::Entity::update_many()
            .col_expr(projects::Column::Version, Expr::value(before.version + 1))
            .col_expr(projects::Column::UpdatedAt, Expr::value(now))
            .col_expr(projects::Column::UpdatedBy, Expr::value(actor_id));
        if let Some(name) = &input.name {
            update = update.col_expr(projects::Column::Name, Expr::value(name.trim().to_string()));
        }
        if let Some(is_active) = input.is_active {
            update = update.col_expr(projects::Column::IsActive, Expr::value(is_active));
        }

        let result = update
            .filter(projects::Column::Id.eq(before.id))
            .filter(projects::Column::Version.eq(input.version))
            .exec(tx.transaction())
            .await?;

        if result.rows_affected == 0 {
            let current = projects::Entity::find_by_id(before.id)
                .one(tx.transaction())
                .await?
                .ok_or(ProjectError::NotFound(id))?;
            return Err(ProjectError::StaleVersion {
                current: current.version,
            });
        }

        let after = projects::Entity::find_by_id(before.id)
            .one(tx.transaction())
            .await?
            .ok_or(ProjectError::NotFound(id))?;

        tx.audit(entry.after(snapshot(&after))).await?;
        Ok(after)
    }
}

fn snapshot(project: &projects::Model) -> Value {
    json!({
        "code": project.code,
        "name": project.name,
        "divisionId": project.division_id,
        "isActive": project.is_active,
        "version": project.version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let stale: AppError = ProjectError::StaleVersion { current: 3 }.into();
        assert_eq!(stale.status_code(), 409);
        assert_eq!(
            stale.public_message(),
            "Project was modified by someone else (current version 3)"
        );

        let missing: AppError = ProjectError::NotFound(ProjectId::new()).into();
        assert_eq!(missing.status_code(), 404);

        let duplicate: AppError = ProjectError::DuplicateCode("P-1".into()).into();
        assert_eq!(duplicate.error_code(), "CONFLICT");

        let division: AppError = ProjectError::DivisionNotFound(DivisionId::new()).into();
        assert_eq!(division.status_code(), 400);
    }
}
