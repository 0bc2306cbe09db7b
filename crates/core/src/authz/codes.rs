//! Well-known permission and role codes.

/// Permission codes checked by the gates.
pub mod permissions {
    /// Global escape hatch. Holders pass every permission gate regardless of scope.
    pub const SYSTEM_FULL_ACCESS: &str = "SYSTEM_FULL_ACCESS";
    /// Read governance projects.
    pub const GOV_PROJECT_READ: &str = "GOV_PROJECT_READ";
    /// Create and update governance projects.
    pub const GOV_PROJECT_WRITE: &str = "GOV_PROJECT_WRITE";
    /// Read month-close state.
    pub const GOV_MONTH_CLOSE_READ: &str = "GOV_MONTH_CLOSE_READ";
    /// Close and reopen months.
    pub const GOV_MONTH_CLOSE_WRITE: &str = "GOV_MONTH_CLOSE_WRITE";
    /// Read the audit trail.
    pub const GOV_AUDIT_READ: &str = "GOV_AUDIT_READ";
    /// Export the audit trail.
    pub const GOV_AUDIT_EXPORT: &str = "GOV_AUDIT_EXPORT";
}

/// Role names with special meaning.
pub mod roles {
    /// Passes every permission gate regardless of scope.
    pub const SUPER_ADMIN: &str = "SUPER_ADMIN";
}
