//! `SeaORM` Entity for projects table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub division_id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub is_active: bool,
    /// Optimistic concurrency counter, bumped on every update.
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub created_by: Option<Uuid>,
    pub updated_at: DateTimeWithTimeZone,
    pub updated_by: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::divisions::Entity",
        from = "Column::DivisionId",
        to = "super::divisions::Column::Id"
    )]
    Divisions,
}

impl Related<super::divisions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Divisions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
