//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the governance schema
//! - Repositories, including the Postgres [`GrantsRepository`] and the
//!   month-close store behind the gate
//! - The [`AuditWriter`] and the [`AuditedTransaction`] every mutation runs in
//! - Database migrations

pub mod audit;
pub mod entities;
pub mod migration;
pub mod repositories;
pub mod transaction;

pub use audit::{AuditError, AuditWriter};
pub use repositories::{
    AuditFilter, AuditRepository, CreateProjectInput, GrantsRepository, MonthCloseRepository,
    ProjectError, ProjectRepository, SetMonthStatusInput, SystemConfigRepository,
    UpdateProjectInput,
};
pub use transaction::AuditedTransaction;

use std::time::Duration;

use coreops_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(options).await
}
