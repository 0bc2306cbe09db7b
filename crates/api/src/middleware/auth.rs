//! Authentication middleware for protected routes.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use coreops_shared::AppError;

use crate::{AppState, error::ApiError};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware that validates access tokens.
///
/// On success the verified [`AuthContext`](coreops_shared::AuthContext) is
/// inserted into the request extensions, exactly once, for the gates and
/// handlers downstream.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| {
            AppError::Unauthorized(
                "Authorization header with Bearer token is required".to_string(),
            )
        })?;

    let auth = state.jwt_service.authenticate(token).inspect_err(|e| {
        tracing::debug!(error = %e, "access token rejected");
    })?;

    request.extensions_mut().insert(auth);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Bearer abc.def", Some("abc.def"))]
    #[case("bearer abc.def", Some("abc.def"))]
    #[case("Bearer   ", None)]
    #[case("Basic dXNlcjpwYXNz", None)]
    #[case("abc.def", None)]
    fn test_extract_bearer_token(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_bearer_token(header), expected);
    }
}
