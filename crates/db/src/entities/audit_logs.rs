//! `SeaORM` Entity for audit_logs table.
//!
//! A database trigger rejects UPDATE and DELETE on this table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub request_id: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub action: String,
    pub severity: String,
    pub scope: Option<String>,
    pub division_id: Option<Uuid>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub before_data: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub after_data: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub meta: Option<Json>,
    pub actor_id: Uuid,
    pub actor_role: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub actor_roles: Option<Json>,
    pub actor_email: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
