//! Read side of the audit trail. There is no update or delete path.

use chrono::{DateTime, Utc};
use coreops_shared::types::{PageRequest, UserId};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::audit_logs;

/// Filters for listing and exporting audit entries. All are optional and
/// combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    /// Entity type, exact match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// Entity id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<Uuid>,
    /// Action, exact match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Acting user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<UserId>,
    /// Request id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Created at or after.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_from: Option<DateTime<Utc>>,
    /// Created at or before.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Treats blank text filters as absent.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for field in [&mut self.entity_type, &mut self.action, &mut self.request_id] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
        self
    }

    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(entity_type) = &self.entity_type {
            cond = cond.add(audit_logs::Column::EntityType.eq(entity_type.clone()));
        }
        if let Some(entity_id) = self.entity_id {
            cond = cond.add(audit_logs::Column::EntityId.eq(entity_id));
        }
        if let Some(action) = &self.action {
            cond = cond.add(audit_logs::Column::Action.eq(action.clone()));
        }
        if let Some(actor_id) = self.actor_id {
            cond = cond.add(audit_logs::Column::ActorId.eq(actor_id.into_inner()));
        }
        if let Some(request_id) = &self.request_id {
            cond = cond.add(audit_logs::Column::RequestId.eq(request_id.clone()));
        }
        if let Some(from) = self.created_from {
            cond = cond.add(audit_logs::Column::CreatedAt.gte(from));
        }
        if let Some(to) = self.created_to {
            cond = cond.add(audit_logs::Column::CreatedAt.lte(to));
        }
        cond
    }
}

/// Audit trail queries.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    /// Creates a new audit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// One page of matching entries, newest first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        filter: &AuditFilter,
        page: &PageRequest,
    ) -> Result<(Vec<audit_logs::Model>, u64), DbErr> {
        let query = audit_logs::Entity::find().filter(filter.condition());

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(audit_logs::Column::CreatedAt)
            .order_by_desc(audit_logs::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((rows, total))
    }

    /// Every entry of one entity, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn timeline(
        &self,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<audit_logs::Model>, DbErr> {
        audit_logs::Entity::find()
            .filter(audit_logs::Column::EntityType.eq(entity_type))
            .filter(audit_logs::Column::EntityId.eq(entity_id))
            .order_by_asc(audit_logs::Column::CreatedAt)
            .order_by_asc(audit_logs::Column::Id)
            .all(&self.db)
            .await
    }

    /// Matching entries for an export, newest first, capped at `limit` rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn export(
        &self,
        filter: &AuditFilter,
        limit: u64,
    ) -> Result<Vec<audit_logs::Model>, DbErr> {
        audit_logs::Entity::find()
            .filter(filter.condition())
            .order_by_desc(audit_logs::Column::CreatedAt)
            .order_by_desc(audit_logs::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
    }
}
