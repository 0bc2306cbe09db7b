//! The audit writer.
//!
//! Audit rows are only ever inserted through a [`DatabaseTransaction`], so a
//! record and the mutation it documents commit or roll back together.

use coreops_core::audit::{AuditEntryError, NewAuditEntry};
use coreops_shared::AppError;
use coreops_shared::types::{AuditLogId, DivisionId};
use sea_orm::{ActiveValue::NotSet, DatabaseTransaction, DbErr, EntityTrait, Set};
use serde_json::Value;
use thiserror::Error;

use crate::entities::audit_logs;

/// Errors raised while writing the audit trail.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The entry failed validation.
    #[error(transparent)]
    Invalid(#[from] AuditEntryError),

    /// The entry was built for a different request than the transaction.
    #[error("audit entry for request {entry} written in transaction of request {transaction}")]
    RequestIdMismatch {
        /// Request id on the entry.
        entry: String,
        /// Request id of the transaction.
        transaction: String,
    },

    /// Commit attempted without any audit entry.
    #[error("refusing to commit a transaction without an audit entry")]
    Unaudited,

    /// Database error.
    #[error("Audit logging failed: {0}")]
    Database(#[from] DbErr),
}

impl From<AuditError> for AppError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::Invalid(e) => e.into(),
            other => Self::internal(other),
        }
    }
}

/// Appends audit entries inside a caller-owned transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditWriter;

impl AuditWriter {
    /// Validates, scrubs, and inserts `entry` using `txn`.
    ///
    /// Never opens or commits a transaction of its own.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Invalid` before touching the database if the
    /// entry is incomplete, or `AuditError::Database` if the insert fails.
    pub async fn write(
        txn: &DatabaseTransaction,
        entry: NewAuditEntry,
    ) -> Result<AuditLogId, AuditError> {
        let entry = entry.prepare()?;
        let id = AuditLogId::new();

        let request_id = entry.request_id.clone();
        let entity_type = entry.entity_type.clone();
        let action = entry.action.clone();

        let actor_roles = if entry.actor.roles.is_empty() {
            None
        } else {
            Some(Value::from(entry.actor.roles))
        };

        let model = audit_logs::ActiveModel {
            id: Set(id.into_inner()),
            request_id: Set(entry.request_id),
            entity_type: Set(entry.entity_type),
            entity_id: Set(entry.entity_id),
            action: Set(entry.action),
            severity: Set(entry.severity.as_str().to_string()),
            scope: Set(entry.scope.map(|s| s.as_str().to_string())),
            division_id: Set(entry.division_id.map(DivisionId::into_inner)),
            before_data: Set(entry.before),
            after_data: Set(entry.after),
            meta: Set(entry.meta),
            actor_id: Set(entry.actor.id.into_inner()),
            actor_role: Set(entry.actor.role),
            actor_roles: Set(actor_roles),
            actor_email: Set(entry.actor.email),
            reason: Set(entry.reason),
            created_at: NotSet,
        };

        if let Err(e) = audit_logs::Entity::insert(model)
            .exec_without_returning(txn)
            .await
        {
            tracing::error!(
                error = %e,
                request_id = %request_id,
                entity_type = %entity_type,
                action = %action,
                "audit logging failed"
            );
            return Err(e.into());
        }

        tracing::debug!(
            audit_id = %id,
            request_id = %request_id,
            entity_type = %entity_type,
            action = %action,
            "audit entry written"
        );
        Ok(id)
    }
}
