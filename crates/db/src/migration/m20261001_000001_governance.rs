//! Governance schema migration.
//!
//! Creates the RBAC tables, divisions, system config, month close, the
//! append-only audit log, and projects.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ORGANIZATION & RBAC
        // ============================================================
        db.execute_unprepared(DIVISIONS_SQL).await?;
        db.execute_unprepared(RBAC_SQL).await?;

        // ============================================================
        // PART 2: GOVERNANCE STATE
        // ============================================================
        db.execute_unprepared(SYSTEM_CONFIG_SQL).await?;
        db.execute_unprepared(MONTH_CLOSES_SQL).await?;

        // ============================================================
        // PART 3: AUDIT TRAIL
        // ============================================================
        db.execute_unprepared(AUDIT_LOGS_SQL).await?;

        // ============================================================
        // PART 4: REFERENCE ENTITIES
        // ============================================================
        db.execute_unprepared(PROJECTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const DIVISIONS_SQL: &str = r"
CREATE TABLE divisions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    code VARCHAR(50) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const RBAC_SQL: &str = r"
CREATE TABLE roles (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(100) NOT NULL UNIQUE,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE permissions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    code VARCHAR(100) NOT NULL UNIQUE,
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE role_permissions (
    role_id UUID NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    permission_id UUID NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (role_id, permission_id)
);

CREATE TABLE user_roles (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL,
    role_id UUID NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    scope VARCHAR(20) NOT NULL CHECK (scope IN ('COMPANY', 'DIVISION')),
    division_id UUID REFERENCES divisions(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_company_scope_has_no_division
        CHECK (scope <> 'COMPANY' OR division_id IS NULL)
);

-- One assignment per (user, role, scope, division)
CREATE UNIQUE INDEX idx_user_roles_unique ON user_roles(
    user_id, role_id, scope, COALESCE(division_id, '00000000-0000-0000-0000-000000000000'::uuid)
);

-- Grant resolution runs once per authorization check
CREATE INDEX idx_user_roles_user ON user_roles(user_id);
";

const SYSTEM_CONFIG_SQL: &str = r"
CREATE TABLE system_config (
    key VARCHAR(100) PRIMARY KEY,
    value TEXT NOT NULL,
    description TEXT,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

INSERT INTO system_config (key, value, description)
VALUES ('MONTH_CLOSE_ENABLED', 'false', 'Freeze mutations while the current month is closed');
";

const MONTH_CLOSES_SQL: &str = r"
CREATE TABLE month_closes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    month DATE NOT NULL CHECK (EXTRACT(DAY FROM month) = 1),
    scope VARCHAR(20) NOT NULL DEFAULT 'COMPANY' CHECK (scope IN ('COMPANY', 'DIVISION')),
    status VARCHAR(10) NOT NULL CHECK (status IN ('OPEN', 'CLOSED')),
    closed_by UUID,
    closed_at TIMESTAMPTZ,
    opened_by UUID,
    opened_at TIMESTAMPTZ,
    reason TEXT NOT NULL CHECK (length(btrim(reason)) > 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
    CONSTRAINT chk_closed_has_closer
        CHECK (status <> 'CLOSED' OR (closed_by IS NOT NULL AND closed_at IS NOT NULL)),
    CONSTRAINT chk_open_has_opener
        CHECK (status <> 'OPEN' OR (opened_by IS NOT NULL AND opened_at IS NOT NULL))
);

-- Latest row per (month, scope) is the current status
CREATE INDEX idx_month_closes_latest ON month_closes(month, scope, created_at DESC, id DESC);
";

const AUDIT_LOGS_SQL: &str = r"
CREATE TABLE audit_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    request_id VARCHAR(128) NOT NULL,
    entity_type VARCHAR(64) NOT NULL,
    entity_id UUID,
    action VARCHAR(64) NOT NULL,
    severity VARCHAR(10) NOT NULL DEFAULT 'MEDIUM'
        CHECK (severity IN ('LOW', 'MEDIUM', 'HIGH', 'CRITICAL')),
    scope VARCHAR(20) CHECK (scope IN ('COMPANY', 'DIVISION')),
    division_id UUID,
    before_data JSONB,
    after_data JSONB,
    meta JSONB,
    actor_id UUID NOT NULL,
    actor_role VARCHAR(100),
    actor_roles JSONB,
    actor_email VARCHAR(255),
    reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
);

CREATE INDEX idx_audit_logs_created ON audit_logs(created_at DESC);
CREATE INDEX idx_audit_logs_entity ON audit_logs(entity_type, entity_id, created_at);
CREATE INDEX idx_audit_logs_request ON audit_logs(request_id);
CREATE INDEX idx_audit_logs_actor ON audit_logs(actor_id, created_at DESC);

-- The audit trail is append-only
CREATE OR REPLACE FUNCTION prevent_audit_log_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'audit_logs is append-only: % is not allowed', TG_OP;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_audit_logs_append_only
BEFORE UPDATE OR DELETE ON audit_logs
FOR EACH ROW
EXECUTE FUNCTION prevent_audit_log_mutation();
";

const PROJECTS_SQL: &str = r"
CREATE TABLE projects (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    division_id UUID NOT NULL REFERENCES divisions(id),
    code VARCHAR(50) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    version INTEGER NOT NULL DEFAULT 1 CHECK (version > 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_by UUID,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_by UUID
);

CREATE INDEX idx_projects_division ON projects(division_id);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS projects CASCADE;
DROP TRIGGER IF EXISTS trg_audit_logs_append_only ON audit_logs;
DROP FUNCTION IF EXISTS prevent_audit_log_mutation();
DROP TABLE IF EXISTS audit_logs CASCADE;
DROP TABLE IF EXISTS month_closes CASCADE;
DROP TABLE IF EXISTS system_config CASCADE;
DROP TABLE IF EXISTS user_roles CASCADE;
DROP TABLE IF EXISTS role_permissions CASCADE;
DROP TABLE IF EXISTS permissions CASCADE;
DROP TABLE IF EXISTS roles CASCADE;
DROP TABLE IF EXISTS divisions CASCADE;
";
