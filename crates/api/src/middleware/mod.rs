//! Request middleware.
//!
//! Protected routes run authentication first, then per route the
//! permission gate, then the month-close gate. The two gates are independent:
//! passing one never skips the other.

pub mod auth;
pub mod month_close;
pub mod permission;
pub mod request_id;
pub mod scope;

use axum::middleware::from_fn_with_state;
use axum::routing::MethodRouter;

use crate::AppState;

pub use auth::authenticate;
pub use month_close::enforce_month_close;
pub use permission::{PermissionGate, enforce_permission};
pub use request_id::{MAX_REQUEST_ID_LEN, screen_request_id};
pub use scope::{BodyDivision, PathDivision, ProjectDivision, ScopeResolver, ScopeTarget};

/// Puts `route` behind the permission gate and then the month-close gate.
pub fn gated(route: MethodRouter<AppState>, state: &AppState, gate: PermissionGate) -> MethodRouter<AppState> {
    route
        .route_layer(from_fn_with_state(state.clone(), enforce_month_close))
        .route_layer(from_fn_with_state(
            permission::GateState::new(state.clone(), gate),
            enforce_permission,
        ))
}
