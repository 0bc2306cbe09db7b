//! Property-based tests for the admission decision.
//!
//! For any grant set, permission code and target division the gate admits
//! iff the caller holds `SYSTEM_FULL_ACCESS`, holds the `SUPER_ADMIN` role,
//! or holds a matching grant that is company-wide or bound to the target.

use proptest::prelude::*;
use uuid::Uuid;

use coreops_shared::types::DivisionId;

use crate::authz::codes::{permissions::SYSTEM_FULL_ACCESS, roles::SUPER_ADMIN};
use crate::authz::decision::evaluate;
use crate::authz::grants::{Grants, Scope, ScopedGrant};
use crate::authz::requirement::Requirement;

const DIVISIONS: [Uuid; 3] = [
    Uuid::from_u128(0xd1),
    Uuid::from_u128(0xd2),
    Uuid::from_u128(0xd3),
];

fn arb_division() -> impl Strategy<Value = Option<DivisionId>> {
    prop_oneof![
        Just(None),
        (0usize..DIVISIONS.len()).prop_map(|i| Some(DivisionId::from_uuid(DIVISIONS[i]))),
    ]
}

fn arb_code() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => Just("GOV_PROJECT_READ".to_string()),
        4 => Just("GOV_PROJECT_WRITE".to_string()),
        3 => Just("GOV_AUDIT_READ".to_string()),
        1 => Just(SYSTEM_FULL_ACCESS.to_string()),
    ]
}

fn arb_role() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => Just("DIVISION_HEAD".to_string()),
        4 => Just("FINANCE_ADMIN".to_string()),
        1 => Just(SUPER_ADMIN.to_string()),
    ]
}

fn arb_scope() -> impl Strategy<Value = Scope> {
    prop_oneof![Just(Scope::Company), Just(Scope::Division)]
}

fn arb_grant() -> impl Strategy<Value = ScopedGrant> {
    (arb_role(), arb_scope(), arb_division(), arb_code())
        .prop_map(|(role, scope, division, code)| ScopedGrant::new(role, scope, division, code))
}

fn expected(grants: &[ScopedGrant], code: &str, target: Option<DivisionId>) -> bool {
    grants.iter().any(|g| g.permission_code == SYSTEM_FULL_ACCESS)
        || grants.iter().any(|g| g.role_name == SUPER_ADMIN)
        || grants.iter().any(|g| {
            g.permission_code == code
                && (g.scope == Scope::Company
                    || (g.division_id.is_some() && g.division_id == target))
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_admission_matches_grant_formula(
        scoped in prop::collection::vec(arb_grant(), 0..6),
        code in arb_code(),
        target in arb_division(),
    ) {
        let grants = Grants::from_scoped(scoped.clone());
        let decision = evaluate(&grants, &Requirement::permission(code.clone()), target);

        prop_assert_eq!(decision.is_admitted(), expected(&scoped, &code, target));
    }

    #[test]
    fn prop_any_of_is_union_of_single_requirements(
        scoped in prop::collection::vec(arb_grant(), 0..6),
        first in arb_code(),
        second in arb_code(),
        target in arb_division(),
    ) {
        let grants = Grants::from_scoped(scoped);
        let either = evaluate(&grants, &Requirement::any_of([first.clone(), second.clone()]), target);
        let one = evaluate(&grants, &Requirement::permission(first), target);
        let other = evaluate(&grants, &Requirement::permission(second), target);

        prop_assert_eq!(either.is_admitted(), one.is_admitted() || other.is_admitted());
    }

    #[test]
    fn prop_company_grant_is_target_independent(
        code in arb_code(),
        target in arb_division(),
    ) {
        let grants = Grants::from_scoped(vec![ScopedGrant::company("FINANCE_ADMIN", code.clone())]);
        prop_assert!(evaluate(&grants, &Requirement::permission(code), target).is_admitted());
    }
}
