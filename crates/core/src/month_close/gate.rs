//! The month-close gate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use coreops_shared::AppResult;
use coreops_shared::config::MonthCloseEnforcement;

use super::month::Month;
use super::policy::{EnforcementPolicy, RouteGroup};
use super::status::{MonthCloseStatus, ensure_open};
use super::store::MonthCloseStore;

/// Why the gate let a request through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    /// GET, HEAD or OPTIONS.
    SafeMethod,
    /// Route group is exempt.
    Exempt,
    /// Enforcement is switched off.
    Disabled,
    /// The current month is open.
    Open,
}

/// Gate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Continue to the handler.
    Pass(PassReason),
    /// The current month is closed.
    Reject,
}

/// Whether `method` never mutates state.
#[must_use]
pub fn is_safe_method(method: &str) -> bool {
    matches!(method, "GET" | "HEAD" | "OPTIONS")
}

/// Freezes non-exempt mutations while the current month is closed.
///
/// Checks short-circuit in order: safe method, exemption, enable flag,
/// status. Safe and exempt requests never read storage.
#[derive(Clone)]
pub struct MonthCloseGate {
    policy: EnforcementPolicy,
    store: Arc<dyn MonthCloseStore>,
}

impl std::fmt::Debug for MonthCloseGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonthCloseGate")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl MonthCloseGate {
    /// Creates a gate.
    #[must_use]
    pub fn new(policy: EnforcementPolicy, store: Arc<dyn MonthCloseStore>) -> Self {
        Self { policy, store }
    }

    /// The enforcement policy.
    #[must_use]
    pub const fn policy(&self) -> &EnforcementPolicy {
        &self.policy
    }

    /// Whether enforcement is active right now.
    ///
    /// # Errors
    ///
    /// Propagates storage failures when the flag is read from system config.
    pub async fn is_enforced(&self) -> AppResult<bool> {
        match self.policy.enforcement() {
            MonthCloseEnforcement::On => Ok(true),
            MonthCloseEnforcement::Off => Ok(false),
            MonthCloseEnforcement::SystemConfig => self.store.enforcement_enabled().await,
        }
    }

    /// Decides a request of `method` to a route in `group` at time `now`.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn check(
        &self,
        method: &str,
        group: Option<RouteGroup>,
        now: DateTime<Utc>,
    ) -> AppResult<GateOutcome> {
        if is_safe_method(method) {
            return Ok(GateOutcome::Pass(PassReason::SafeMethod));
        }
        if self.policy.is_exempt(group) {
            return Ok(GateOutcome::Pass(PassReason::Exempt));
        }
        if !self.is_enforced().await? {
            return Ok(GateOutcome::Pass(PassReason::Disabled));
        }

        match self.store.company_status(Month::current(now)).await? {
            MonthCloseStatus::Closed => Ok(GateOutcome::Reject),
            MonthCloseStatus::Open => Ok(GateOutcome::Pass(PassReason::Open)),
        }
    }

    /// Guards a write that targets a specific month.
    ///
    /// For handlers whose payload names the month they write into (backdated
    /// corrections, period postings). None of the governance routes do, since
    /// projects and exports are not month-bound and month-close management
    /// itself must stay writable; domain modules mounted later call it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MonthClosed` if enforcement is active and `month`
    /// is closed, or propagates storage failures.
    pub async fn ensure_month_open(&self, month: Month) -> AppResult<()> {
        if !self.is_enforced().await? {
            return Ok(());
        }
        let status = self.store.company_status(month).await?;
        ensure_open(month, status)
    }
}
