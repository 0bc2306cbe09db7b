//! Enforcement policy: when the month-close gate is active and where it is not.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use coreops_shared::config::{MonthCloseConfig, MonthCloseEnforcement};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API areas that can be exempted from month-close enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteGroup {
    /// Attendance capture.
    Attendance,
    /// Timesheet entry and approval.
    Timesheets,
    /// Leave requests.
    Leave,
    /// Month-close management itself.
    MonthClose,
    /// Audit trail reads and exports.
    Audit,
    /// Governance projects.
    Projects,
    /// Organizational divisions.
    Divisions,
    /// Employee records.
    Employees,
    /// Roles and permission assignments.
    Rbac,
    /// Runtime system configuration.
    SystemConfig,
    /// Reports.
    Reports,
}

impl RouteGroup {
    /// Every route group.
    pub const ALL: [Self; 11] = [
        Self::Attendance,
        Self::Timesheets,
        Self::Leave,
        Self::MonthClose,
        Self::Audit,
        Self::Projects,
        Self::Divisions,
        Self::Employees,
        Self::Rbac,
        Self::SystemConfig,
        Self::Reports,
    ];

    /// Configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::Timesheets => "timesheets",
            Self::Leave => "leave",
            Self::MonthClose => "month_close",
            Self::Audit => "audit",
            Self::Projects => "projects",
            Self::Divisions => "divisions",
            Self::Employees => "employees",
            Self::Rbac => "rbac",
            Self::SystemConfig => "system_config",
            Self::Reports => "reports",
        }
    }
}

impl fmt::Display for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration named a route group that does not exist.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown route group '{0}'")]
pub struct UnknownRouteGroup(pub String);

impl FromStr for RouteGroup {
    type Err = UnknownRouteGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|group| group.as_str() == wanted)
            .ok_or_else(|| UnknownRouteGroup(s.to_string()))
    }
}

/// Month-close enforcement: the toggle and the exempt route groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementPolicy {
    enforcement: MonthCloseEnforcement,
    exempt: BTreeSet<RouteGroup>,
}

impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self::new(
            MonthCloseEnforcement::SystemConfig,
            [
                RouteGroup::Attendance,
                RouteGroup::Timesheets,
                RouteGroup::Leave,
                RouteGroup::MonthClose,
            ],
        )
    }
}

impl EnforcementPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(
        enforcement: MonthCloseEnforcement,
        exempt: impl IntoIterator<Item = RouteGroup>,
    ) -> Self {
        Self {
            enforcement,
            exempt: exempt.into_iter().collect(),
        }
    }

    /// Builds the policy from configuration.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRouteGroup` for the first exemption that does not
    /// name a route group.
    pub fn from_config(config: &MonthCloseConfig) -> Result<Self, UnknownRouteGroup> {
        let exempt = config
            .exempt
            .iter()
            .map(|name| name.parse::<RouteGroup>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self {
            enforcement: config.enforcement,
            exempt,
        })
    }

    /// The enforcement toggle.
    #[must_use]
    pub const fn enforcement(&self) -> MonthCloseEnforcement {
        self.enforcement
    }

    /// Whether requests of `group` bypass the gate. Untagged routes never do.
    #[must_use]
    pub fn is_exempt(&self, group: Option<RouteGroup>) -> bool {
        group.is_some_and(|group| self.exempt.contains(&group))
    }

    /// Exempt groups in a stable order.
    pub fn exempt_groups(&self) -> impl Iterator<Item = RouteGroup> + '_ {
        self.exempt.iter().copied()
    }
}

/// Interprets a system config flag value (`true`, `1`, `yes`, `enabled`).
#[must_use]
pub fn is_truthy_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "enabled"
    )
}
