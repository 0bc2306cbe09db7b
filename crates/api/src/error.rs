//! HTTP error mapping.
//!
//! Handlers and middleware fail with [`ApiError`]. Its response carries an
//! [`ErrorReport`] extension; the [`error_boundary`] middleware, which knows
//! the request id and the disclosure settings, renders the final body:
//!
//! ```json
//! {"error": "FORBIDDEN", "message": "Forbidden", "requestId": "...",
//!  "requiredPermission": "GOV_PROJECT_READ", "availablePermissions": []}
//! ```

use std::any::Any;

use axum::{
    Json,
    extract::{
        Request, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use coreops_core::export::ExportError;
use coreops_db::{AuditError, ProjectError};
use coreops_shared::{AppError, CapabilityError, JwtError, PermissionDenial};
use sea_orm::DbErr;
use serde_json::{Map, Value, json};

use crate::{AppState, REQUEST_ID_HEADER};

/// An error returned from a handler or middleware.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        Self(err.into())
    }
}

impl From<ProjectError> for ApiError {
    fn from(err: ProjectError) -> Self {
        Self(err.into())
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        Self(err.into())
    }
}

impl From<CapabilityError> for ApiError {
    fn from(err: CapabilityError) -> Self {
        Self(err.into())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        Self(err.into())
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self(AppError::database(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(AppError::Validation(rejection.body_text()))
    }
}

/// Everything needed to render an error body once the request id is known.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    status: StatusCode,
    code: &'static str,
    message: String,
    denial: Option<PermissionDenial>,
    detail: Option<String>,
}

impl ErrorReport {
    /// HTTP status of the failure.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Server-side detail of an internal failure. Never sent to the caller.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Builds the JSON body.
    #[must_use]
    pub fn body(&self, request_id: Option<&str>, expose_permission_details: bool) -> Value {
        let mut body = Map::new();
        body.insert("error".into(), json!(self.code));
        body.insert("message".into(), json!(self.message));
        body.insert("requestId".into(), json!(request_id));

        if let Some(denial) = self.denial.as_ref().filter(|_| expose_permission_details) {
            if let [single] = denial.required.as_slice() {
                body.insert("requiredPermission".into(), json!(single));
            } else {
                body.insert("requiredPermissions".into(), json!(denial.required));
            }
            body.insert("availablePermissions".into(), json!(denial.available));
        }

        Value::Object(body)
    }

    fn render(self, request_id: Option<&str>, expose_permission_details: bool) -> Response {
        let body = self.body(request_id, expose_permission_details);
        let status = self.status;
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl From<&AppError> for ErrorReport {
    fn from(err: &AppError) -> Self {
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let denial = match err {
            AppError::PermissionDenied(denial) => Some((**denial).clone()),
            _ => None,
        };
        Self {
            status,
            code: err.error_code(),
            message: err.public_message(),
            denial,
            detail: err.is_internal().then(|| err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ErrorReport::from(&self.0).render(None, false)
    }
}

/// Reads the request id assigned by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok())
}

/// Renders every [`ErrorReport`] with the request id and logs internal
/// failures with their full detail.
pub async fn error_boundary(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let request_id = request_id(request.headers()).map(str::to_string);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    if let Some(detail) = report.detail() {
        tracing::error!(
            request_id = request_id.as_deref().unwrap_or("-"),
            %method,
            path,
            code = report.code(),
            detail,
            "request failed"
        );
    }

    let mut rendered = report.render(
        request_id.as_deref(),
        state.settings.expose_permission_details,
    );
    for (name, value) in response.headers() {
        if !rendered.headers().contains_key(name) {
            rendered.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rendered
}

/// Turns a caught panic into an internal error.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| (*s).to_string()))
        .unwrap_or_else(|| "unknown panic payload".to_string());

    ApiError(AppError::Internal(format!("handler panicked: {detail}"))).into_response()
}
