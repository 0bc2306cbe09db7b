//! Property-based tests for the month-close gate.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use coreops_shared::config::MonthCloseEnforcement;
use proptest::prelude::*;

use crate::month_close::gate::{GateOutcome, MonthCloseGate, is_safe_method};
use crate::month_close::month::Month;
use crate::month_close::policy::{EnforcementPolicy, RouteGroup};
use crate::month_close::status::MonthCloseStatus;
use crate::month_close::store::InMemoryMonthCloseStore;

fn arb_method() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("GET"),
        Just("HEAD"),
        Just("OPTIONS"),
        Just("POST"),
        Just("PUT"),
        Just("PATCH"),
        Just("DELETE"),
    ]
}

fn arb_group() -> impl Strategy<Value = Option<RouteGroup>> {
    prop_oneof![
        Just(None),
        (0usize..RouteGroup::ALL.len()).prop_map(|i| Some(RouteGroup::ALL[i])),
    ]
}

fn arb_enforcement() -> impl Strategy<Value = MonthCloseEnforcement> {
    prop_oneof![
        Just(MonthCloseEnforcement::On),
        Just(MonthCloseEnforcement::Off),
        Just(MonthCloseEnforcement::SystemConfig),
    ]
}

fn arb_status() -> impl Strategy<Value = MonthCloseStatus> {
    prop_oneof![Just(MonthCloseStatus::Open), Just(MonthCloseStatus::Closed)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The gate rejects exactly the unsafe, non-exempt requests made while
    /// enforcement is active and the current month is closed.
    #[test]
    fn prop_reject_iff_enforced_closed_and_unsafe(
        method in arb_method(),
        group in arb_group(),
        enforcement in arb_enforcement(),
        flag in any::<bool>(),
        status in arb_status(),
        day in 1u32..=28,
    ) {
        let now = Utc.with_ymd_and_hms(2026, 10, day, 8, 0, 0).unwrap();
        let store = Arc::new(
            InMemoryMonthCloseStore::new()
                .enabled(flag)
                .with_status(Month::current(now), status),
        );
        let policy = EnforcementPolicy::new(enforcement, EnforcementPolicy::default().exempt_groups());
        let gate = MonthCloseGate::new(policy.clone(), store.clone());

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let outcome = runtime.block_on(gate.check(method, group, now)).unwrap();

        let enforced = match enforcement {
            MonthCloseEnforcement::On => true,
            MonthCloseEnforcement::Off => false,
            MonthCloseEnforcement::SystemConfig => flag,
        };
        let expect_reject = !is_safe_method(method)
            && !policy.is_exempt(group)
            && enforced
            && status == MonthCloseStatus::Closed;

        prop_assert_eq!(outcome == GateOutcome::Reject, expect_reject);
        if is_safe_method(method) || policy.is_exempt(group) {
            prop_assert_eq!(store.reads(), 0);
        }
    }
}
