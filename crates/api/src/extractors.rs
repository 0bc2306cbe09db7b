//! Request extractors.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use coreops_core::audit::AuditActor;
use coreops_core::authz::Authorization;
use coreops_shared::{AppError, AuthContext};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::REQUEST_ID_HEADER;
use crate::error::{ApiError, request_id};
use crate::middleware::request_id::is_usable_request_id;

/// Query string extractor whose rejection uses the API error shape.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

/// Path extractor whose rejection uses the API error shape.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

/// JSON body that has passed its `validator` rules.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        Ok(Self(value))
    }
}

/// Everything a handler knows about the caller.
///
/// `authorization` is present on routes behind the permission gate.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id, also stamped on audit rows.
    pub request_id: String,
    /// The authenticated identity.
    pub auth: AuthContext,
    /// Roles and permissions, set by the permission gate on admission.
    pub authorization: Option<Authorization>,
}

impl RequestContext {
    /// The audit actor for this request.
    #[must_use]
    pub fn actor(&self) -> AuditActor {
        AuditActor::from_request(&self.auth, self.authorization.as_ref())
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .filter(|value| is_usable_request_id(value))
            .and_then(|_| request_id(&parts.headers))
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);

        Ok(Self {
            request_id,
            auth,
            authorization: parts.extensions.get::<Authorization>().cloned(),
        })
    }
}
