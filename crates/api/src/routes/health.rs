//! Liveness probe, mounted at the root without authentication.
//!
//! Besides the build version it reports the month-close policy the process
//! was started with, so operators can see which route groups stay writable
//! after a close.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use coreops_core::month_close::{Month, RouteGroup};
use coreops_shared::config::MonthCloseEnforcement;
use serde::Serialize;

use crate::AppState;

/// Probe response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `healthy` when the process answers.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Month the gate currently guards.
    pub current_month: Month,
    /// Configured gate policy.
    pub month_close: MonthClosePolicyView,
}

/// Month-close policy as configured at startup.
#[derive(Debug, Serialize)]
pub struct MonthClosePolicyView {
    /// `on`, `off` or `system_config`.
    pub enforcement: MonthCloseEnforcement,
    /// Route groups the gate never blocks.
    pub exempt: Vec<RouteGroup>,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let policy = state.month_close.policy();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        current_month: Month::current(Utc::now()),
        month_close: MonthClosePolicyView {
            enforcement: policy.enforcement(),
            exempt: policy.exempt_groups().collect(),
        },
    })
}

/// Creates the health route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/healthz", get(health_check))
}
