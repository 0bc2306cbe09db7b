//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Mutating operations take an [`AuditedTransaction`](crate::AuditedTransaction)
//! so the change and its audit entry commit together.

pub mod audit;
pub mod grants;
pub mod month_close;
pub mod project;
pub mod system_config;

pub use audit::{AuditFilter, AuditRepository};
pub use grants::GrantsRepository;
pub use month_close::{MonthCloseRepository, SetMonthStatusInput};
pub use project::{CreateProjectInput, ProjectError, ProjectRepository, UpdateProjectInput};
pub use system_config::SystemConfigRepository;

/// Converts a page bound to a Postgres `BIGINT` parameter.
pub(crate) fn sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
