//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and applied by the server
//! at startup when `database.run_migrations` is set.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_governance;
mod m20261001_000002_seed_permissions;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_governance::Migration),
            Box::new(m20261001_000002_seed_permissions::Migration),
        ]
    }
}
