//! `SeaORM` Entity for month_closes table.
//!
//! Append-only: each close or reopen inserts a row, and the newest row of a
//! (month, scope) pair is its current status.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "month_closes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// First day of the month.
    pub month: Date,
    pub scope: String,
    /// `OPEN` or `CLOSED`.
    pub status: String,
    pub closed_by: Option<Uuid>,
    pub closed_at: Option<DateTimeWithTimeZone>,
    pub opened_by: Option<Uuid>,
    pub opened_at: Option<DateTimeWithTimeZone>,
    pub reason: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
