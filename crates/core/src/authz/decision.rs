//! The admission decision.

use coreops_shared::AppError;
use coreops_shared::types::DivisionId;

use super::grants::{Grant, Grants, ScopedGrant};
use super::requirement::Requirement;

/// Why a request was admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Global bypass.
    Universal,
    /// The first scoped grant that qualified.
    Scoped(ScopedGrant),
}

/// Outcome of evaluating a requirement against a grant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Request may proceed.
    Admit(Admission),
    /// No qualifying grant.
    Deny,
}

impl Decision {
    /// Whether the request may proceed.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit(_))
    }
}

/// Evaluates `requirement` for a request targeting `target`.
///
/// Grants are scanned in order and the first qualifying entry wins. No
/// precedence exists between several qualifying scoped grants.
#[must_use]
pub fn evaluate(grants: &Grants, requirement: &Requirement, target: Option<DivisionId>) -> Decision {
    for grant in grants.grants() {
        match grant {
            Grant::Universal => return Decision::Admit(Admission::Universal),
            Grant::Scoped(scoped)
                if requirement.matches(&scoped.permission_code) && scoped.applies_to(target) =>
            {
                return Decision::Admit(Admission::Scoped(scoped.clone()));
            }
            Grant::Scoped(_) => {}
        }
    }
    Decision::Deny
}

/// Builds the 403 error for a denied requirement.
#[must_use]
pub fn denial(grants: &Grants, requirement: &Requirement) -> AppError {
    AppError::permission_denied(requirement.codes().iter().cloned(), grants.permissions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::codes::{
        permissions::{GOV_PROJECT_READ, GOV_PROJECT_WRITE, SYSTEM_FULL_ACCESS},
        roles::SUPER_ADMIN,
    };

    #[test]
    fn test_division_read_admits_own_division_only() {
        let d1 = DivisionId::new();
        let d2 = DivisionId::new();
        let grants = Grants::from_scoped(vec![ScopedGrant::division(
            "DIVISION_HEAD",
            GOV_PROJECT_READ,
            d1,
        )]);
        let req = Requirement::permission(GOV_PROJECT_READ);

        assert!(evaluate(&grants, &req, Some(d1)).is_admitted());
        assert_eq!(evaluate(&grants, &req, Some(d2)), Decision::Deny);
        assert_eq!(evaluate(&grants, &req, None), Decision::Deny);
    }

    #[test]
    fn test_code_must_match() {
        let d1 = DivisionId::new();
        let grants = Grants::from_scoped(vec![ScopedGrant::company("FINANCE_ADMIN", GOV_PROJECT_READ)]);
        assert_eq!(
            evaluate(&grants, &Requirement::permission(GOV_PROJECT_WRITE), Some(d1)),
            Decision::Deny
        );
    }

    #[test]
    fn test_company_grant_covers_unknown_target() {
        let grants = Grants::from_scoped(vec![ScopedGrant::company("FINANCE_ADMIN", GOV_PROJECT_READ)]);
        assert!(evaluate(&grants, &Requirement::permission(GOV_PROJECT_READ), None).is_admitted());
    }

    #[test]
    fn test_first_qualifying_grant_wins() {
        let d1 = DivisionId::new();
        let first = ScopedGrant::division("DIVISION_HEAD", GOV_PROJECT_READ, d1);
        let second = ScopedGrant::company("FINANCE_ADMIN", GOV_PROJECT_READ);
        let grants = Grants::from_scoped(vec![first.clone(), second]);

        assert_eq!(
            evaluate(&grants, &Requirement::permission(GOV_PROJECT_READ), Some(d1)),
            Decision::Admit(Admission::Scoped(first))
        );
    }

    #[test]
    fn test_universal_ignores_requirement_and_scope() {
        let by_role = Grants::new(vec![SUPER_ADMIN.to_string()], Vec::new());
        let by_permission = Grants::from_scoped(vec![ScopedGrant::company("OPS", SYSTEM_FULL_ACCESS)]);
        let req = Requirement::permission(GOV_PROJECT_WRITE);

        assert_eq!(
            evaluate(&by_role, &req, None),
            Decision::Admit(Admission::Universal)
        );
        assert_eq!(
            evaluate(&by_permission, &req, Some(DivisionId::new())),
            Decision::Admit(Admission::Universal)
        );
    }

    #[test]
    fn test_any_of_admits_on_second_code() {
        let grants = Grants::from_scoped(vec![ScopedGrant::company("AUDITOR", "GOV_AUDIT_EXPORT")]);
        let req = Requirement::any_of(["GOV_AUDIT_READ", "GOV_AUDIT_EXPORT"]);
        assert!(evaluate(&grants, &req, None).is_admitted());
    }

    #[test]
    fn test_denial_reports_required_and_available() {
        let grants = Grants::from_scoped(vec![ScopedGrant::company("VIEWER", GOV_PROJECT_READ)]);
        let err = denial(&grants, &Requirement::permission(GOV_PROJECT_WRITE));

        let AppError::PermissionDenied(details) = err else {
            panic!("expected permission denial");
        };
        assert_eq!(details.required, vec![GOV_PROJECT_WRITE]);
        assert_eq!(details.available, vec![GOV_PROJECT_READ]);
    }
}
