//! Application configuration management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Capability token configuration.
    #[serde(default)]
    pub capability: CapabilityConfig,
    /// Month-close enforcement configuration.
    #[serde(default)]
    pub month_close: MonthCloseConfig,
    /// Authorization response configuration.
    #[serde(default)]
    pub authz: AuthzConfig,
    /// Export artifact configuration.
    #[serde(default)]
    pub exports: ExportConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Apply pending schema migrations at startup.
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration for access tokens issued by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Expected `iss` claim.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Expected `aud` claim.
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Access token lifetime in seconds, used when minting tokens.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_issuer() -> String {
    "coreops".to_string()
}

fn default_audience() -> String {
    "coreops-web".to_string()
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Capability token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CapabilityConfig {
    /// Dedicated signing secret. Falls back to the JWT secret when unset.
    #[serde(default)]
    pub secret: Option<String>,
    /// Lifetime of issued capabilities in seconds.
    #[serde(default = "default_capability_ttl")]
    pub ttl_secs: u64,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_secs: default_capability_ttl(),
        }
    }
}

fn default_capability_ttl() -> u64 {
    600 // 10 minutes
}

/// How the month-close gate decides whether it is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthCloseEnforcement {
    /// Always enforce.
    On,
    /// Never enforce.
    Off,
    /// Read the `MONTH_CLOSE_ENABLED` system config flag on each check.
    #[default]
    SystemConfig,
}

/// Month-close enforcement configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthCloseConfig {
    /// Enforcement toggle.
    #[serde(default)]
    pub enforcement: MonthCloseEnforcement,
    /// Route groups that stay writable while a month is closed.
    #[serde(default = "default_exempt_groups")]
    pub exempt: Vec<String>,
}

impl Default for MonthCloseConfig {
    fn default() -> Self {
        Self {
            enforcement: MonthCloseEnforcement::default(),
            exempt: default_exempt_groups(),
        }
    }
}

fn default_exempt_groups() -> Vec<String> {
    ["attendance", "timesheets", "leave", "month_close"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Authorization response configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthzConfig {
    /// Echo required and available permission codes in 403 bodies.
    #[serde(default = "default_true")]
    pub expose_permission_details: bool,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            expose_permission_details: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Export artifact configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// The single directory download capabilities may resolve into.
    #[serde(default = "default_export_root")]
    pub root: PathBuf,
    /// Upper bound on rows written to one export.
    #[serde(default = "default_export_max_rows")]
    pub max_rows: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            root: default_export_root(),
            max_rows: default_export_max_rows(),
        }
    }
}

fn default_export_root() -> PathBuf {
    PathBuf::from("storage/report_exports")
}

fn default_export_max_rows() -> u64 {
    10_000
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default)]
    pub filter: Option<String>,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("COREOPS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("month_close.exempt")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Returns the secret used to sign capability tokens.
    #[must_use]
    pub fn capability_secret(&self) -> &str {
        self.capability.secret.as_deref().unwrap_or(&self.jwt.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_required<F: FnOnce()>(extra: &[(&str, Option<&str>)], f: F) {
        let mut vars = vec![
            ("COREOPS__DATABASE__URL", Some("postgres://localhost/coreops")),
            ("COREOPS__JWT__SECRET", Some("test-secret")),
        ];
        vars.extend_from_slice(extra);
        temp_env::with_vars(vars, f);
    }

    #[test]
    fn test_load_applies_defaults() {
        with_required(&[], || {
            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.capability.ttl_secs, 600);
            assert_eq!(
                config.month_close.enforcement,
                MonthCloseEnforcement::SystemConfig
            );
            assert_eq!(
                config.month_close.exempt,
                vec!["attendance", "timesheets", "leave", "month_close"]
            );
            assert!(config.authz.expose_permission_details);
            assert_eq!(config.exports.root, PathBuf::from("storage/report_exports"));
            assert_eq!(config.logging.format, LogFormat::Pretty);
        });
    }

    #[test]
    fn test_capability_secret_falls_back_to_jwt_secret() {
        with_required(&[], || {
            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.capability_secret(), "test-secret");
        });

        with_required(&[("COREOPS__CAPABILITY__SECRET", Some("cap-secret"))], || {
            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.capability_secret(), "cap-secret");
        });
    }

    #[test]
    fn test_env_overrides_month_close_policy() {
        with_required(
            &[
                ("COREOPS__MONTH_CLOSE__ENFORCEMENT", Some("on")),
                ("COREOPS__MONTH_CLOSE__EXEMPT", Some("attendance,month_close")),
                ("COREOPS__AUTHZ__EXPOSE_PERMISSION_DETAILS", Some("false")),
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(config.month_close.enforcement, MonthCloseEnforcement::On);
                assert_eq!(config.month_close.exempt, vec!["attendance", "month_close"]);
                assert!(!config.authz.expose_permission_details);
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars(
            [
                ("COREOPS__DATABASE__URL", None::<&str>),
                ("COREOPS__JWT__SECRET", Some("test-secret")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
