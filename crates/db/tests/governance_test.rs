//! Integration tests for the governance schema.
//!
//! These run against the Postgres database named by `DATABASE_URL` and are
//! skipped when it is unset.

use std::env;

use chrono::Utc;
use coreops_core::audit::{AuditActor, NewAuditEntry, action, entity};
use coreops_core::authz::{GrantsResolver, Scope, ScopedGrant};
use coreops_core::month_close::{Month, MonthCloseStatus, MonthCloseStore};
use coreops_db::entities::{
    audit_logs, divisions, month_closes, permissions, role_permissions, roles, user_roles,
};
use coreops_db::migration::{Migrator, MigratorTrait};
use coreops_db::{
    AuditedTransaction, CreateProjectInput, GrantsRepository, MonthCloseRepository,
    ProjectRepository, SetMonthStatusInput, SystemConfigRepository, UpdateProjectInput,
};
use coreops_shared::types::{DivisionId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};
use tokio::sync::Mutex;
use uuid::Uuid;

static MIGRATIONS: Mutex<()> = Mutex::const_new(());

async fn connect() -> Option<DatabaseConnection> {
    let Ok(url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let db = Database::connect(&url).await.expect("database should be reachable");

    let _guard = MIGRATIONS.lock().await;
    Migrator::up(&db, None).await.expect("migrations should apply");
    Some(db)
}

async fn create_division(db: &DatabaseConnection) -> DivisionId {
    let id = Uuid::new_v4();
    divisions::ActiveModel {
        id: Set(id),
        code: Set(format!("DIV-{}", &id.simple().to_string()[..8])),
        name: Set("Test Division".to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap();
    DivisionId::from_uuid(id)
}

async fn audit_rows_for(db: &DatabaseConnection, request_id: &str) -> u64 {
    audit_logs::Entity::find()
        .filter(audit_logs::Column::RequestId.eq(request_id))
        .count(db)
        .await
        .unwrap()
}

fn request_id() -> String {
    format!("test-{}", Uuid::new_v4())
}

#[tokio::test]
async fn test_committed_mutation_has_exactly_one_audit_row() {
    let Some(db) = connect().await else { return };
    let division = create_division(&db).await;
    let req = request_id();

    let mut tx = AuditedTransaction::begin(&db, &req).await.unwrap();
    ProjectRepository::create(
        &mut tx,
        AuditActor::user(UserId::new()),
        CreateProjectInput {
            division_id: division,
            code: format!("P-{}", Uuid::new_v4()),
            name: "Audit me".to_string(),
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(audit_rows_for(&db, &req).await, 1);
}

#[tokio::test]
async fn test_failed_mutation_leaves_no_audit_row() {
    let Some(db) = connect().await else { return };
    let req = request_id();

    let mut tx = AuditedTransaction::begin(&db, &req).await.unwrap();
    tx.audit(NewAuditEntry::new(
        &req,
        AuditActor::user(UserId::new()),
        entity::PROJECT,
        action::CREATE,
    ))
    .await
    .unwrap();

    let orphan = coreops_db::entities::projects::ActiveModel {
        id: Set(Uuid::new_v4()),
        division_id: Set(Uuid::new_v4()),
        code: Set(format!("P-{}", Uuid::new_v4())),
        name: Set("No division".to_string()),
        is_active: Set(true),
        version: Set(1),
        created_at: Set(Utc::now().into()),
        created_by: Set(None),
        updated_at: Set(Utc::now().into()),
        updated_by: Set(None),
    }
    .insert(tx.transaction())
    .await;
    assert!(orphan.is_err());
    drop(tx);

    assert_eq!(audit_rows_for(&db, &req).await, 0);
}

#[tokio::test]
async fn test_audit_rows_are_append_only() {
    let Some(db) = connect().await else { return };
    let req = request_id();

    let mut tx = AuditedTransaction::begin(&db, &req).await.unwrap();
    let id = tx
        .audit(NewAuditEntry::new(
            &req,
            AuditActor::user(UserId::new()),
            entity::PROJECT,
            action::UPDATE,
        ))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let update = db
        .execute_unprepared(&format!(
            "UPDATE audit_logs SET action = 'TAMPERED' WHERE id = '{id}'"
        ))
        .await;
    assert!(update.is_err());

    let delete = db
        .execute_unprepared(&format!("DELETE FROM audit_logs WHERE id = '{id}'"))
        .await;
    assert!(delete.is_err());
}

#[tokio::test]
async fn test_grants_repository_resolves_scoped_grants() {
    let Some(db) = connect().await else { return };
    let division = create_division(&db).await;
    let user = UserId::new();
    let suffix = Uuid::new_v4().simple().to_string();

    let role_id = Uuid::new_v4();
    roles::ActiveModel {
        id: Set(role_id),
        name: Set(format!("HEAD_{suffix}")),
        description: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&db)
    .await
    .unwrap();

    let permission = permissions::Entity::find()
        .filter(permissions::Column::Code.eq("GOV_PROJECT_READ"))
        .one(&db)
        .await
        .unwrap()
        .expect("seeded permission");

    role_permissions::ActiveModel {
        role_id: Set(role_id),
        permission_id: Set(permission.id),
        created_at: Set(Utc::now().into()),
    }
    .insert(&db)
    .await
    .unwrap();

    user_roles::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.into_inner()),
        role_id: Set(role_id),
        scope: Set("DIVISION".to_string()),
        division_id: Set(Some(division.into_inner())),
        created_at: Set(Utc::now().into()),
    }
    .insert(&db)
    .await
    .unwrap();

    let grants = GrantsRepository::new(db.clone())
        .grants_for(user)
        .await
        .unwrap();
    assert_eq!(
        grants.scoped().cloned().collect::<Vec<_>>(),
        vec![ScopedGrant::division(format!("HEAD_{suffix}"), "GOV_PROJECT_READ", division)]
    );

    let nobody = GrantsRepository::new(db).grants_for(UserId::new()).await.unwrap();
    assert_eq!(nobody.grants().len(), 0);
}

#[tokio::test]
async fn test_month_close_lifecycle() {
    let Some(db) = connect().await else { return };
    let repo = MonthCloseRepository::new(db.clone());
    let month = Month::from_ym(1901, 1).unwrap();
    month_closes::Entity::delete_many()
        .filter(month_closes::Column::Month.eq(month.first_day()))
        .exec(&db)
        .await
        .unwrap();
    let actor = AuditActor::user(UserId::new());

    let close = |status, reason: &str| SetMonthStatusInput {
        month,
        scope: Scope::Company,
        status,
        reason: reason.to_string(),
    };

    let req = request_id();
    let mut tx = AuditedTransaction::begin(&db, &req).await.unwrap();
    let row = MonthCloseRepository::set_status(
        &mut tx,
        actor.clone(),
        close(MonthCloseStatus::Closed, "Books reconciled"),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(row.status, "CLOSED");
    assert_eq!(repo.company_status(month).await.unwrap(), MonthCloseStatus::Closed);
    assert_eq!(audit_rows_for(&db, &req).await, 1);

    let mut tx = AuditedTransaction::begin(&db, request_id()).await.unwrap();
    let again = MonthCloseRepository::set_status(
        &mut tx,
        actor.clone(),
        close(MonthCloseStatus::Closed, "twice"),
    )
    .await
    .unwrap_err();
    assert_eq!(again.status_code(), 409);
    drop(tx);

    let mut tx = AuditedTransaction::begin(&db, request_id()).await.unwrap();
    MonthCloseRepository::set_status(&mut tx, actor, close(MonthCloseStatus::Open, "Correction"))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(repo.company_status(month).await.unwrap(), MonthCloseStatus::Open);
}

#[tokio::test]
async fn test_month_close_flag_reads_system_config() {
    let Some(db) = connect().await else { return };
    let repo = MonthCloseRepository::new(db.clone());

    let original = SystemConfigRepository::new(db.clone())
        .get("MONTH_CLOSE_ENABLED")
        .await
        .unwrap()
        .unwrap_or_else(|| "false".to_string());

    SystemConfigRepository::set(&db, "MONTH_CLOSE_ENABLED", " Enabled ").await.unwrap();
    assert!(repo.enforcement_enabled().await.unwrap());

    SystemConfigRepository::set(&db, "MONTH_CLOSE_ENABLED", "nope").await.unwrap();
    assert!(!repo.enforcement_enabled().await.unwrap());

    SystemConfigRepository::set(&db, "MONTH_CLOSE_ENABLED", &original).await.unwrap();
}

#[tokio::test]
async fn test_stale_project_version_conflicts_without_audit() {
    let Some(db) = connect().await else { return };
    let division = create_division(&db).await;
    let actor = AuditActor::user(UserId::new());

    let mut tx = AuditedTransaction::begin(&db, request_id()).await.unwrap();
    let project = ProjectRepository::create(
        &mut tx,
        actor.clone(),
        CreateProjectInput {
            division_id: division,
            code: format!("P-{}", Uuid::new_v4()),
            name: "Versioned".to_string(),
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    let project_id = project.id.into();

    let mut tx = AuditedTransaction::begin(&db, request_id()).await.unwrap();
    let updated = ProjectRepository::update(
        &mut tx,
        actor.clone(),
        project_id,
        UpdateProjectInput {
            version: 1,
            name: Some("Renamed".to_string()),
            ..UpdateProjectInput::default()
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.name, "Renamed");

    let stale_req = request_id();
    let mut tx = AuditedTransaction::begin(&db, &stale_req).await.unwrap();
    let err = ProjectRepository::update(
        &mut tx,
        actor,
        project_id,
        UpdateProjectInput {
            version: 1,
            name: Some("Lost update".to_string()),
            ..UpdateProjectInput::default()
        },
    )
    .await
    .unwrap_err();
    drop(tx);

    let app: coreops_shared::AppError = err.into();
    assert_eq!(app.status_code(), 409);
    assert_eq!(audit_rows_for(&db, &stale_req).await, 0);
}
