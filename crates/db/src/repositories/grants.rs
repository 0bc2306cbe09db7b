//! Grant resolution against the RBAC tables.

use async_trait::async_trait;
use coreops_core::authz::{Grants, GrantsResolver, Scope, ScopedGrant};
use coreops_shared::types::{DivisionId, UserId};
use coreops_shared::{AppError, AppResult};
use sea_orm::{DatabaseConnection, DbBackend, DbErr, FromQueryResult, Statement};
use uuid::Uuid;

/// One (assignment, permission) pair. `permission_code` is `None` for a role
/// that carries no permissions.
#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct GrantRow {
    pub role_name: String,
    pub scope: String,
    pub division_id: Option<Uuid>,
    pub permission_code: Option<String>,
}

const GRANTS_SQL: &str = r"
SELECT r.name AS role_name, ur.scope, ur.division_id, p.code AS permission_code
FROM user_roles ur
JOIN roles r ON r.id = ur.role_id
LEFT JOIN role_permissions rp ON rp.role_id = r.id
LEFT JOIN permissions p ON p.id = rp.permission_id
WHERE ur.user_id = $1
ORDER BY ur.created_at, ur.id, p.code
";

/// Loads grant sets with one query per call. Nothing is cached.
#[derive(Debug, Clone)]
pub struct GrantsRepository {
    db: DatabaseConnection,
}

impl GrantsRepository {
    /// Creates a new grants repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads the current grants of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn load(&self, user_id: UserId) -> Result<Grants, DbErr> {
        let rows = GrantRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            GRANTS_SQL,
            [user_id.into_inner().into()],
        ))
        .all(&self.db)
        .await?;

        Ok(grants_from_rows(rows))
    }
}

#[async_trait]
impl GrantsResolver for GrantsRepository {
    async fn grants_for(&self, user_id: UserId) -> AppResult<Grants> {
        self.load(user_id).await.map_err(AppError::database)
    }
}

pub(crate) fn grants_from_rows(rows: Vec<GrantRow>) -> Grants {
    let roles: Vec<String> = rows.iter().map(|row| row.role_name.clone()).collect();

    let scoped = rows.into_iter().filter_map(|row| {
        let code = row.permission_code?;
        match row.scope.parse::<Scope>() {
            Ok(scope) => Some(ScopedGrant::new(
                row.role_name,
                scope,
                row.division_id.map(DivisionId::from_uuid),
                code,
            )),
            Err(e) => {
                tracing::warn!(error = %e, role = %row.role_name, "skipping grant with unknown scope");
                None
            }
        }
    });

    Grants::new(roles, scoped)
}
