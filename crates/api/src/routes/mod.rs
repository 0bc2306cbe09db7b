//! API route definitions.

use axum::{Router, middleware::from_fn_with_state};

use crate::{AppState, middleware::authenticate};

pub mod audit;
pub mod health;
pub mod month_close;
pub mod projects;

/// Creates the `/api/v1` router. Every route in it requires authentication.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let governance = Router::new()
        .merge(audit::routes(state))
        .merge(month_close::routes(state))
        .merge(projects::routes(state));

    Router::new()
        .nest("/governance", governance)
        .layer(from_fn_with_state(state.clone(), authenticate))
}
