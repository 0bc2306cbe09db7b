//! Grant model: scopes, scoped grants, and a user's resolved grant set.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use coreops_shared::types::DivisionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::codes::{permissions::SYSTEM_FULL_ACCESS, roles::SUPER_ADMIN};

/// Where a role assignment applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    /// Company-wide.
    Company,
    /// Within one division only.
    Division,
}

impl Scope {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Company => "COMPANY",
            Self::Division => "DIVISION",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown scope string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown scope: {0}")]
pub struct UnknownScope(pub String);

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "COMPANY" => Ok(Self::Company),
            "DIVISION" => Ok(Self::Division),
            _ => Err(UnknownScope(s.to_string())),
        }
    }
}

/// A permission code granted through one role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopedGrant {
    /// Role that carried the permission.
    pub role_name: String,
    /// Assignment scope.
    pub scope: Scope,
    /// Division of a `DIVISION` assignment. Always `None` for `COMPANY`.
    pub division_id: Option<DivisionId>,
    /// Granted permission code.
    pub permission_code: String,
}

impl ScopedGrant {
    /// Creates a grant, dropping the division of company-scoped assignments.
    #[must_use]
    pub fn new(
        role_name: impl Into<String>,
        scope: Scope,
        division_id: Option<DivisionId>,
        permission_code: impl Into<String>,
    ) -> Self {
        Self {
            role_name: role_name.into(),
            scope,
            division_id: match scope {
                Scope::Company => None,
                Scope::Division => division_id,
            },
            permission_code: permission_code.into(),
        }
    }

    /// Company-wide grant.
    #[must_use]
    pub fn company(role_name: impl Into<String>, permission_code: impl Into<String>) -> Self {
        Self::new(role_name, Scope::Company, None, permission_code)
    }

    /// Grant limited to one division.
    #[must_use]
    pub fn division(
        role_name: impl Into<String>,
        permission_code: impl Into<String>,
        division_id: DivisionId,
    ) -> Self {
        Self::new(role_name, Scope::Division, Some(division_id), permission_code)
    }

    /// Whether this grant covers a request targeting `target`.
    ///
    /// A division grant never covers an unknown target, and a division grant
    /// stored without a division never covers anything.
    #[must_use]
    pub fn applies_to(&self, target: Option<DivisionId>) -> bool {
        match self.scope {
            Scope::Company => true,
            Scope::Division => matches!(
                (self.division_id, target),
                (Some(granted), Some(requested)) if granted == requested
            ),
        }
    }
}

/// One entry of a resolved grant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// Holder passes every permission gate. Decided once at construction.
    Universal,
    /// An ordinary scoped grant.
    Scoped(ScopedGrant),
}

/// The roles, flattened permissions and scoped grants of one user.
///
/// Built fresh for every check; never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grants {
    roles: BTreeSet<String>,
    permissions: BTreeSet<String>,
    grants: Vec<Grant>,
}

impl Grants {
    /// A user with no assignments.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the grant set from role names and scoped grants.
    ///
    /// Roles referenced by the grants are added to `roles`. If the set
    /// contains `SYSTEM_FULL_ACCESS` or the `SUPER_ADMIN` role, a
    /// [`Grant::Universal`] entry is placed first.
    #[must_use]
    pub fn new(
        roles: impl IntoIterator<Item = String>,
        scoped: impl IntoIterator<Item = ScopedGrant>,
    ) -> Self {
        let scoped: Vec<ScopedGrant> = scoped.into_iter().collect();
        let mut roles: BTreeSet<String> = roles.into_iter().collect();
        roles.extend(scoped.iter().map(|g| g.role_name.clone()));
        let permissions: BTreeSet<String> =
            scoped.iter().map(|g| g.permission_code.clone()).collect();

        let universal =
            permissions.contains(SYSTEM_FULL_ACCESS) || roles.contains(SUPER_ADMIN);

        let grants = universal
            .then_some(Grant::Universal)
            .into_iter()
            .chain(scoped.into_iter().map(Grant::Scoped))
            .collect();

        Self {
            roles,
            permissions,
            grants,
        }
    }

    /// Builds the grant set from scoped grants alone.
    #[must_use]
    pub fn from_scoped(scoped: impl IntoIterator<Item = ScopedGrant>) -> Self {
        Self::new(std::iter::empty(), scoped)
    }

    /// Whether the set carries the global bypass.
    #[must_use]
    pub fn is_universal(&self) -> bool {
        matches!(self.grants.first(), Some(Grant::Universal))
    }

    /// Sorted role names.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    /// Sorted, scope-flattened permission codes.
    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }

    /// Whether the user holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Whether the user holds `code` in any scope.
    #[must_use]
    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.contains(code)
    }

    /// All entries in evaluation order.
    #[must_use]
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    /// Scoped entries in evaluation order.
    pub fn scoped(&self) -> impl Iterator<Item = &ScopedGrant> {
        self.grants.iter().filter_map(|grant| match grant {
            Grant::Scoped(scoped) => Some(scoped),
            Grant::Universal => None,
        })
    }

    /// The summary attached to admitted requests.
    #[must_use]
    pub fn authorization(&self) -> Authorization {
        Authorization {
            roles: self.roles.iter().cloned().collect(),
            permissions: self.permissions.iter().cloned().collect(),
        }
    }
}

/// Roles and permissions of an admitted caller, for downstream filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Authorization {
    /// Sorted role names.
    pub roles: Vec<String>,
    /// Sorted permission codes.
    pub permissions: Vec<String>,
}

impl Authorization {
    /// Whether the caller holds `code` in any scope.
    #[must_use]
    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.iter().any(|p| p == code)
    }
}
