//! Shared types, errors, and configuration for CoreOps.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - Access token validation and capability tokens

pub mod auth;
pub mod capability;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{AuthContext, Claims};
pub use capability::{CapabilityError, CapabilityGrant, CapabilityService};
pub use config::AppConfig;
pub use error::{AppError, AppResult, PermissionDenial};
pub use jwt::{JwtConfig, JwtError, JwtService};
