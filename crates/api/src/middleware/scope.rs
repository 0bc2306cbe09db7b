//! Scope resolvers: which division a request targets.
//!
//! A resolver that cannot determine the division returns `None`. Only
//! company-scoped grants (and the universal grant) qualify for such a
//! request, so a failed lookup can never widen access.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::Method;
use coreops_db::ProjectRepository;
use coreops_shared::types::{DivisionId, ProjectId};
use serde_json::Value;

use crate::AppState;

/// The parts of a request a resolver may look at.
#[derive(Debug, Clone)]
pub struct ScopeTarget {
    /// HTTP method.
    pub method: Method,
    /// Matched path parameters.
    pub params: HashMap<String, String>,
    /// Parsed JSON body, when the resolver asked for it and it parsed.
    pub body: Option<Value>,
}

impl ScopeTarget {
    /// A path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// A top-level string field of the body.
    #[must_use]
    pub fn body_str(&self, field: &str) -> Option<&str> {
        self.body.as_ref()?.get(field)?.as_str()
    }
}

/// Maps a request to the division it targets.
#[async_trait]
pub trait ScopeResolver: Send + Sync {
    /// Whether the gate must buffer and parse the request body first.
    fn needs_body(&self) -> bool {
        false
    }

    /// The targeted division, or `None` if it cannot be determined.
    async fn resolve(&self, state: &AppState, target: &ScopeTarget) -> Option<DivisionId>;
}

/// Division id taken from a path parameter.
#[derive(Debug, Clone, Copy)]
pub struct PathDivision(pub &'static str);

#[async_trait]
impl ScopeResolver for PathDivision {
    async fn resolve(&self, _state: &AppState, target: &ScopeTarget) -> Option<DivisionId> {
        target.param(self.0)?.parse().ok()
    }
}

/// Division id taken from a top-level field of the JSON body.
#[derive(Debug, Clone, Copy)]
pub struct BodyDivision(pub &'static str);

#[async_trait]
impl ScopeResolver for BodyDivision {
    fn needs_body(&self) -> bool {
        true
    }

    async fn resolve(&self, _state: &AppState, target: &ScopeTarget) -> Option<DivisionId> {
        target.body_str(self.0)?.parse().ok()
    }
}

/// Division owning the project named by a path parameter.
#[derive(Debug, Clone, Copy)]
pub struct ProjectDivision(pub &'static str);

#[async_trait]
impl ScopeResolver for ProjectDivision {
    async fn resolve(&self, state: &AppState, target: &ScopeTarget) -> Option<DivisionId> {
        let project_id: ProjectId = target.param(self.0)?.parse().ok()?;

        match ProjectRepository::new(state.db.clone())
            .division_of(project_id)
            .await
        {
            Ok(division) => division,
            Err(e) => {
                tracing::warn!(%project_id, error = %e, "could not resolve project division");
                None
            }
        }
    }
}
