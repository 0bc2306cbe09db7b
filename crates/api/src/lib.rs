//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for the governance surface
//! - Authentication, permission and month-close middleware
//! - Request extractors
//! - The error boundary that renders every failure as one JSON shape

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    http::header,
    middleware::{from_fn, from_fn_with_state},
};
use coreops_core::authz::GrantsResolver;
use coreops_core::export::ExportStorage;
use coreops_core::month_close::MonthCloseGate;
use coreops_shared::{AppConfig, CapabilityService, JwtService};
use sea_orm::DatabaseConnection;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tunables read once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiSettings {
    /// Echo required and available permission codes in 403 bodies.
    pub expose_permission_details: bool,
    /// Lifetime of download capabilities.
    pub capability_ttl_secs: u64,
    /// Upper bound on rows in one export.
    pub export_max_rows: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            expose_permission_details: true,
            capability_ttl_secs: 600,
            export_max_rows: 10_000,
        }
    }
}

impl From<&AppConfig> for ApiSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            expose_permission_details: config.authz.expose_permission_details,
            capability_ttl_secs: config.capability.ttl_secs,
            export_max_rows: config.exports.max_rows,
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DatabaseConnection,
    /// Verifies access tokens.
    pub jwt_service: Arc<JwtService>,
    /// Issues and verifies download capabilities.
    pub capabilities: Arc<CapabilityService>,
    /// Resolves a user's grants on every gated request.
    pub grants: Arc<dyn GrantsResolver>,
    /// The month-close gate.
    pub month_close: Arc<MonthCloseGate>,
    /// Export artifact storage.
    pub exports: Arc<ExportStorage>,
    /// Tunables.
    pub settings: ApiSettings,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("month_close", &self.month_close)
            .field("exports", &self.exports)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Creates the main application router.
///
/// Layers, outermost first: CORS, sensitive-header marking, request id
/// screening, request id assignment, tracing, request id propagation, the error boundary, panic
/// catching.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .nest("/api/v1", routes::api_routes(&state))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(from_fn_with_state(state.clone(), error::error_boundary))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(from_fn(middleware::screen_request_id))
        .layer(SetSensitiveRequestHeadersLayer::new([header::AUTHORIZATION]))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
