//! The month-close gate as middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use coreops_core::month_close::{GateOutcome, RouteGroup};
use coreops_shared::AppError;

use crate::{AppState, error::ApiError};

/// Message of the 403 returned while the current month is closed.
pub const MONTH_CLOSED_MESSAGE: &str = "Month is closed";

/// Rejects non-exempt mutations while the current month is closed.
///
/// The route group comes from the [`RouteGroup`] extension each router group
/// installs; a route without one is never exempt.
pub async fn enforce_month_close(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let group = request.extensions().get::<RouteGroup>().copied();
    let outcome = state
        .month_close
        .check(request.method().as_str(), group, Utc::now())
        .await?;

    if outcome == GateOutcome::Reject {
        tracing::warn!(
            method = %request.method(),
            path = request.uri().path(),
            route_group = group.map_or("-", RouteGroup::as_str),
            "mutation rejected: month is closed"
        );
        return Err(AppError::Forbidden(MONTH_CLOSED_MESSAGE.to_string()).into());
    }

    Ok(next.run(request).await)
}
