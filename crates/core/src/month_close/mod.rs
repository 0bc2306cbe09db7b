//! Month close: freezing mutations against a closed accounting period.
//!
//! The [`MonthCloseGate`] runs after the permission gate and is driven by
//! wall-clock time and an [`EnforcementPolicy`], not by grants: a caller who
//! holds every permission is still blocked while the current month is closed.

mod gate;
mod month;
mod policy;
mod status;
mod store;

#[cfg(test)]
mod gate_props;

pub use gate::{GateOutcome, MonthCloseGate, PassReason, is_safe_method};
pub use month::{InvalidMonth, Month};
pub use policy::{EnforcementPolicy, RouteGroup, UnknownRouteGroup, is_truthy_flag};
pub use status::{MonthCloseStatus, UnknownStatus, check_transition, ensure_open};
pub use store::{InMemoryMonthCloseStore, MonthCloseStore};

/// System config key holding the enable flag.
pub const MONTH_CLOSE_ENABLED_KEY: &str = "MONTH_CLOSE_ENABLED";

/// Audit entity type of month-close changes.
pub const MONTH_CLOSE_ENTITY: &str = "MONTH_CLOSE";
