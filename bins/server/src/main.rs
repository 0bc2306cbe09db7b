//! CoreOps governance API server
//!
//! Usage:
//!   coreops           - Serve the API (applies migrations first when
//!                       `database.run_migrations` is set)
//!   coreops migrate   - Apply pending migrations and exit

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use coreops_api::{ApiSettings, AppState, create_router};
use coreops_core::export::ExportStorage;
use coreops_core::month_close::{EnforcementPolicy, MonthCloseGate};
use coreops_db::migration::{Migrator, MigratorTrait};
use coreops_db::{GrantsRepository, MonthCloseRepository, connect};
use coreops_shared::config::{LogFormat, LoggingConfig};
use coreops_shared::{AppConfig, CapabilityService, JwtConfig, JwtService};

const DEFAULT_LOG_FILTER: &str = "coreops=debug,tower_http=info";

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(logging.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
    });
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let migrate_only = std::env::args().nth(1).as_deref() == Some("migrate");

    let db = connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    if migrate_only || config.database.run_migrations {
        Migrator::up(&db, None)
            .await
            .context("failed to apply migrations")?;
        info!("Migrations applied");
        if migrate_only {
            return Ok(());
        }
    }

    // Unknown route group names are a startup error
    let policy = EnforcementPolicy::from_config(&config.month_close)
        .context("invalid month_close.exempt")?;
    info!(
        enforcement = ?policy.enforcement(),
        exempt = ?policy.exempt_groups().collect::<Vec<_>>(),
        "Month-close policy configured"
    );

    let exports = ExportStorage::open(&config.exports.root)
        .await
        .with_context(|| format!("failed to open export root {}", config.exports.root.display()))?;

    let state = AppState {
        db: db.clone(),
        jwt_service: Arc::new(JwtService::new(JwtConfig::from(&config.jwt))),
        capabilities: Arc::new(CapabilityService::new(config.capability_secret())),
        grants: Arc::new(GrantsRepository::new(db.clone())),
        month_close: Arc::new(MonthCloseGate::new(
            policy,
            Arc::new(MonthCloseRepository::new(db)),
        )),
        exports: Arc::new(exports),
        settings: ApiSettings::from(&config),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
