//! The permission gate.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::{FromRequestParts, RawPathParams, Request, State},
    middleware::Next,
    response::Response,
};
use coreops_core::authz::{Admission, Decision, Requirement, denial, evaluate};
use coreops_shared::types::DivisionId;
use coreops_shared::{AppError, AuthContext};

use super::scope::{ScopeResolver, ScopeTarget};
use crate::{AppState, error::ApiError};

/// Largest body a scope resolver will buffer.
const MAX_SCOPE_BODY_BYTES: usize = 1024 * 1024;

/// A route's permission requirement and how to find its target division.
///
/// Without a resolver the route is company-scoped: division grants never
/// qualify.
#[derive(Clone)]
pub struct PermissionGate {
    requirement: Requirement,
    resolver: Option<Arc<dyn ScopeResolver>>,
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("requirement", &self.requirement)
            .field("scoped", &self.resolver.is_some())
            .finish()
    }
}

impl PermissionGate {
    /// Requires exactly `code`.
    #[must_use]
    pub fn require(code: &str) -> Self {
        Self {
            requirement: Requirement::permission(code),
            resolver: None,
        }
    }

    /// Requires any one of `codes`.
    #[must_use]
    pub fn any_of(codes: &[&str]) -> Self {
        Self {
            requirement: Requirement::any_of(codes.iter().copied()),
            resolver: None,
        }
    }

    /// Resolves the target division with `resolver`.
    #[must_use]
    pub fn scoped_by(mut self, resolver: impl ScopeResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// The requirement this gate enforces.
    #[must_use]
    pub const fn requirement(&self) -> &Requirement {
        &self.requirement
    }
}

/// Middleware state: the application plus one route's gate.
#[derive(Debug, Clone)]
pub struct GateState {
    app: AppState,
    gate: PermissionGate,
}

impl GateState {
    /// Pairs a gate with the application state.
    #[must_use]
    pub const fn new(app: AppState, gate: PermissionGate) -> Self {
        Self { app, gate }
    }
}

/// Admits the request if the caller's grants satisfy the route's requirement
/// for the division it targets.
///
/// Grants are resolved on every request. A universal grant admits without
/// consulting the scope resolver. On admission the caller's
/// [`Authorization`](coreops_core::authz::Authorization) is attached to the
/// request.
pub async fn enforce_permission(
    State(GateState { app, gate }): State<GateState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = request
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let grants = app.grants.grants_for(auth.user_id).await?;

    let (mut request, target) = if grants.is_universal() {
        (request, None)
    } else {
        resolve_target(&app, &gate, request).await?
    };

    match evaluate(&grants, &gate.requirement, target) {
        Decision::Admit(admission) => {
            tracing::debug!(
                user_id = %auth.user_id,
                permission = %gate.requirement,
                division_id = ?target,
                universal = matches!(admission, Admission::Universal),
                "permission granted"
            );
        }
        Decision::Deny => {
            tracing::warn!(
                user_id = %auth.user_id,
                permission = %gate.requirement,
                division_id = ?target,
                method = %request.method(),
                path = request.uri().path(),
                "permission denied"
            );
            return Err(denial(&grants, &gate.requirement).into());
        }
    }

    request.extensions_mut().insert(grants.authorization());
    Ok(next.run(request).await)
}

async fn resolve_target(
    app: &AppState,
    gate: &PermissionGate,
    request: Request,
) -> Result<(Request, Option<DivisionId>), ApiError> {
    let Some(resolver) = gate.resolver.as_ref() else {
        return Ok((request, None));
    };

    let (mut parts, body) = request.into_parts();
    let params: HashMap<String, String> = RawPathParams::from_request_parts(&mut parts, app)
        .await
        .map(|raw| {
            raw.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let (body, json) = if resolver.needs_body() {
        let bytes = to_bytes(body, MAX_SCOPE_BODY_BYTES)
            .await
            .map_err(|_| AppError::Validation("Request body is too large".to_string()))?;
        let json = serde_json::from_slice(&bytes).ok();
        (Body::from(bytes), json)
    } else {
        (body, None)
    };

    let target = ScopeTarget {
        method: parts.method.clone(),
        params,
        body: json,
    };
    let division = resolver.resolve(app, &target).await;

    Ok((Request::from_parts(parts, body), division))
}
