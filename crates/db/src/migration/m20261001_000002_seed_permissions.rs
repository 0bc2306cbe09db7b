//! Seeds the governance permission codes and the super-admin role.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(SEED_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(UNSEED_SQL).await?;
        Ok(())
    }
}

const SEED_SQL: &str = r"
INSERT INTO permissions (code, description) VALUES
    ('SYSTEM_FULL_ACCESS', 'Bypasses every permission gate'),
    ('GOV_PROJECT_READ', 'Read governance projects'),
    ('GOV_PROJECT_WRITE', 'Create and update governance projects'),
    ('GOV_MONTH_CLOSE_READ', 'Read month-close status'),
    ('GOV_MONTH_CLOSE_WRITE', 'Close and reopen months'),
    ('GOV_AUDIT_READ', 'Read the audit trail'),
    ('GOV_AUDIT_EXPORT', 'Export the audit trail')
ON CONFLICT (code) DO NOTHING;

INSERT INTO roles (name, description) VALUES
    ('SUPER_ADMIN', 'Unrestricted administrator')
ON CONFLICT (name) DO NOTHING;

INSERT INTO role_permissions (role_id, permission_id)
SELECT r.id, p.id
FROM roles r
JOIN permissions p ON p.code = 'SYSTEM_FULL_ACCESS'
WHERE r.name = 'SUPER_ADMIN'
ON CONFLICT DO NOTHING;
";

const UNSEED_SQL: &str = r"
DELETE FROM roles WHERE name = 'SUPER_ADMIN';
DELETE FROM permissions WHERE code IN (
    'SYSTEM_FULL_ACCESS',
    'GOV_PROJECT_READ',
    'GOV_PROJECT_WRITE',
    'GOV_MONTH_CLOSE_READ',
    'GOV_MONTH_CLOSE_WRITE',
    'GOV_AUDIT_READ',
    'GOV_AUDIT_EXPORT'
);
";
