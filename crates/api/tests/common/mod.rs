//! Router harness: the real middleware stack over in-memory grant and
//! month-close stores and a mock database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::Utc;
use coreops_api::{ApiSettings, AppState, create_router};
use coreops_core::authz::{Grants, InMemoryGrants, ScopedGrant};
use coreops_core::export::ExportStorage;
use coreops_core::month_close::{
    EnforcementPolicy, InMemoryMonthCloseStore, Month, MonthCloseGate, MonthCloseStatus,
};
use coreops_db::entities::projects;
use coreops_shared::types::{DivisionId, UserId};
use coreops_shared::{CapabilityService, JwtConfig, JwtService};
use http_body_util::BodyExt;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use tempfile::TempDir;
use uuid::Uuid;

pub const SECRET: &str = "router-test-secret";

pub struct TestApp {
    pub router: Router,
    pub jwt: Arc<JwtService>,
    pub capabilities: Arc<CapabilityService>,
    pub exports: Arc<ExportStorage>,
    _export_dir: TempDir,
}

pub struct TestAppBuilder {
    grants: InMemoryGrants,
    store: InMemoryMonthCloseStore,
    db: DatabaseConnection,
    settings: ApiSettings,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            grants: InMemoryGrants::new(),
            store: InMemoryMonthCloseStore::new(),
            db: MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            settings: ApiSettings::default(),
        }
    }

    pub fn user(mut self, user: UserId, grants: Grants) -> Self {
        self.grants = self.grants.with_user(user, grants);
        self
    }

    /// Enables enforcement and closes the current month.
    pub fn current_month_closed(mut self) -> Self {
        self.store = self
            .store
            .enabled(true)
            .with_status(Month::current(Utc::now()), MonthCloseStatus::Closed);
        self
    }

    pub fn db(mut self, db: MockDatabase) -> Self {
        self.db = db.into_connection();
        self
    }

    pub fn settings(mut self, settings: ApiSettings) -> Self {
        self.settings = settings;
        self
    }

    pub async fn build(self) -> TestApp {
        let export_dir = TempDir::new().unwrap();
        let exports = Arc::new(ExportStorage::open(export_dir.path()).await.unwrap());
        let jwt = Arc::new(JwtService::new(JwtConfig {
            secret: SECRET.to_string(),
            ..JwtConfig::default()
        }));
        let capabilities = Arc::new(CapabilityService::new(SECRET));
        let gate = MonthCloseGate::new(EnforcementPolicy::default(), Arc::new(self.store));

        let state = AppState {
            db: self.db,
            jwt_service: jwt.clone(),
            capabilities: capabilities.clone(),
            grants: Arc::new(self.grants),
            month_close: Arc::new(gate),
            exports: exports.clone(),
            settings: self.settings,
        };

        TestApp {
            router: create_router(state),
            jwt,
            capabilities,
            exports,
            _export_dir: export_dir,
        }
    }
}

impl TestApp {
    pub fn token(&self, user: UserId) -> String {
        self.jwt
            .generate_access_token(user.into_inner(), Some("STAFF"))
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        use tower::ServiceExt;

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, headers, body)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<UserId>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.send(request).await
    }
}

pub fn super_admin() -> Grants {
    Grants::new(["SUPER_ADMIN".to_string()], [])
}

pub fn division_reader(division: DivisionId) -> Grants {
    Grants::from_scoped([ScopedGrant::division("PM", "GOV_PROJECT_READ", division)])
}

pub fn project(id: Uuid, division: DivisionId) -> projects::Model {
    let now = Utc::now().fixed_offset();
    projects::Model {
        id,
        division_id: division.into_inner(),
        code: format!("P-{}", &id.to_string()[..8]),
        name: "Warehouse audit".to_string(),
        is_active: true,
        version: 1,
        created_at: now,
        created_by: None,
        updated_at: now,
        updated_by: None,
    }
}
