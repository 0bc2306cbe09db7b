//! Month-close records.

use async_trait::async_trait;
use chrono::Utc;
use coreops_core::audit::{AuditActor, NewAuditEntry, Severity, entity, normalize_reason};
use coreops_core::authz::Scope;
use coreops_core::month_close::{Month, MonthCloseStatus, MonthCloseStore, check_transition};
use coreops_shared::types::PageRequest;
use coreops_shared::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, FromQueryResult, QueryFilter, QueryOrder, Set, Statement,
};
use serde_json::json;
use uuid::Uuid;

use super::sql_int;
use super::system_config::SystemConfigRepository;
use crate::entities::month_closes;
use crate::transaction::AuditedTransaction;

const LIST_SQL: &str = r"
SELECT * FROM (
    SELECT DISTINCT ON (month, scope) *
    FROM month_closes
    ORDER BY month, scope, created_at DESC, id DESC
) latest
ORDER BY month DESC, scope
LIMIT $1 OFFSET $2
";

const COUNT_SQL: &str = r"
SELECT COUNT(*) AS total FROM (SELECT DISTINCT month, scope FROM month_closes) pairs
";

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

/// Input for a close or reopen.
#[derive(Debug, Clone)]
pub struct SetMonthStatusInput {
    /// Target month.
    pub month: Month,
    /// Scope the record applies to.
    pub scope: Scope,
    /// Desired status.
    pub status: MonthCloseStatus,
    /// Why the status changes.
    pub reason: String,
}

/// Month-close repository.
#[derive(Debug, Clone)]
pub struct MonthCloseRepository {
    db: DatabaseConnection,
}

impl MonthCloseRepository {
    /// Creates a new month-close repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Newest record of `month` for `scope`, read through `conn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn latest<C: ConnectionTrait>(
        conn: &C,
        month: Month,
        scope: Scope,
    ) -> Result<Option<month_closes::Model>, DbErr> {
        month_closes::Entity::find()
            .filter(month_closes::Column::Month.eq(month.first_day()))
            .filter(month_closes::Column::Scope.eq(scope.as_str()))
            .order_by_desc(month_closes::Column::CreatedAt)
            .order_by_desc(month_closes::Column::Id)
            .one(conn)
            .await
    }

    /// Current company-scope status of `month`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn status(&self, month: Month) -> AppResult<MonthCloseStatus> {
        let latest = Self::latest(&self.db, month, Scope::Company)
            .await
            .map_err(AppError::database)?;
        status_of(latest.as_ref())
    }

    /// Current record of every (month, scope) pair, newest month first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, page: &PageRequest) -> Result<(Vec<month_closes::Model>, u64), DbErr> {
        let rows = month_closes::Entity::find()
            .from_raw_sql(Statement::from_sql_and_values(
                DbBackend::Postgres,
                LIST_SQL,
                [sql_int(page.limit()).into(), sql_int(page.offset()).into()],
            ))
            .all(&self.db)
            .await?;

        let total = CountRow::find_by_statement(Statement::from_string(
            DbBackend::Postgres,
            COUNT_SQL,
        ))
        .one(&self.db)
        .await?
        .map_or(0, |row| u64::try_from(row.total).unwrap_or(0));

        Ok((rows, total))
    }

    /// Closes or reopens a month for one scope inside `tx`, with its audit entry.
    ///
    /// # Errors
    ///
    /// - `Validation` if the reason is blank
    /// - `Conflict` if the month already has the requested status
    /// - database or audit failures
    pub async fn set_status(
        tx: &mut AuditedTransaction,
        actor: AuditActor,
        input: SetMonthStatusInput,
    ) -> AppResult<month_closes::Model> {
        let reason = normalize_reason(Some(&input.reason))
            .ok_or_else(|| AppError::Validation("Reason is required".to_string()))?;

        let latest = Self::latest(tx.transaction(), input.month, input.scope)
            .await
            .map_err(AppError::database)?;
        let current = status_of(latest.as_ref())?;
        check_transition(current, input.status)?;

        let now = Utc::now();
        let closing = input.status == MonthCloseStatus::Closed;
        let actor_id = actor.id.into_inner();

        let row = month_closes::ActiveModel {
            id: Set(Uuid::now_v7()),
            month: Set(input.month.first_day()),
            scope: Set(input.scope.as_str().to_string()),
            status: Set(input.status.as_str().to_string()),
            closed_by: Set(closing.then_some(actor_id)),
            closed_at: Set(closing.then(|| now.into())),
            opened_by: Set((!closing).then_some(actor_id)),
            opened_at: Set((!closing).then(|| now.into())),
            reason: Set(reason.clone()),
            created_at: Set(now.into()),
        }
        .insert(tx.transaction())
        .await
        .map_err(AppError::database)?;

        let entry = NewAuditEntry::new(
            tx.request_id(),
            actor,
            entity::MONTH_CLOSE,
            input.status.audit_action(),
        )
        .entity(row.id)
        .severity(Severity::High)
        .scoped(input.scope, None)
        .before(json!({"month": input.month, "scope": input.scope, "status": current}))
        .after(json!({"month": input.month, "scope": input.scope, "status": input.status}))
        .reason(reason);
        tx.audit(entry).await?;

        tracing::info!(
            month = %input.month,
            scope = %input.scope,
            status = %input.status,
            request_id = %tx.request_id(),
            "month-close status changed"
        );
        Ok(row)
    }
}

fn status_of(row: Option<&month_closes::Model>) -> AppResult<MonthCloseStatus> {
    row.map_or(Ok(MonthCloseStatus::Open), |r| {
        r.status.parse().map_err(AppError::internal)
    })
}

#[async_trait]
impl MonthCloseStore for MonthCloseRepository {
    async fn enforcement_enabled(&self) -> AppResult<bool> {
        SystemConfigRepository::new(self.db.clone())
            .month_close_enabled()
            .await
            .map_err(AppError::database)
    }

    async fn company_status(&self, month: Month) -> AppResult<MonthCloseStatus> {
        self.status(month).await
    }
}
