//! System configuration key/value flags.

use coreops_core::month_close::{MONTH_CLOSE_ENABLED_KEY, is_truthy_flag};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Set, sea_query::OnConflict,
};

use crate::entities::system_config;

/// System config repository.
#[derive(Debug, Clone)]
pub struct SystemConfigRepository {
    db: DatabaseConnection,
}

impl SystemConfigRepository {
    /// Creates a new system config repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, key: &str) -> Result<Option<String>, DbErr> {
        Ok(system_config::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?
            .map(|row| row.value))
    }

    /// Whether `MONTH_CLOSE_ENABLED` holds a truthy value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn month_close_enabled(&self) -> Result<bool, DbErr> {
        Ok(self
            .get(MONTH_CLOSE_ENABLED_KEY)
            .await?
            .is_some_and(|value| is_truthy_flag(&value)))
    }

    /// Inserts or replaces `key` using `conn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub async fn set<C: ConnectionTrait>(conn: &C, key: &str, value: &str) -> Result<(), DbErr> {
        let row = system_config::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            description: Set(None),
            updated_at: Set(chrono::Utc::now().into()),
        };

        system_config::Entity::insert(row)
            .on_conflict(
                OnConflict::column(system_config::Column::Key)
                    .update_columns([system_config::Column::Value, system_config::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
        Ok(())
    }
}
