//! Core governance rules for CoreOps.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached through the async traits each module declares.
//!
//! # Modules
//!
//! - `authz` - Scoped grants and the admission decision
//! - `month_close` - Month-close gate, policy, and status transitions
//! - `audit` - Audit entries, validation, and masking
//! - `export` - CSV export artifacts and their contained storage root

pub mod audit;
pub mod authz;
pub mod export;
pub mod month_close;
