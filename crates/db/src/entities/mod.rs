//! `SeaORM` entity definitions for the governance schema.

pub mod audit_logs;
pub mod divisions;
pub mod month_closes;
pub mod permissions;
pub mod projects;
pub mod role_permissions;
pub mod roles;
pub mod system_config;
pub mod user_roles;

/// Common imports for entity consumers.
pub mod prelude {
    pub use super::audit_logs::Entity as AuditLogs;
    pub use super::divisions::Entity as Divisions;
    pub use super::month_closes::Entity as MonthCloses;
    pub use super::permissions::Entity as Permissions;
    pub use super::projects::Entity as Projects;
    pub use super::role_permissions::Entity as RolePermissions;
    pub use super::roles::Entity as Roles;
    pub use super::system_config::Entity as SystemConfig;
    pub use super::user_roles::Entity as UserRoles;
}
