//! Permission resolution and admission.
//!
//! A user's [`Grants`] are resolved from storage on every check, then
//! [`evaluate`] decides whether they satisfy a route's [`Requirement`] for the
//! division the request targets.

pub mod codes;
mod decision;
mod grants;
mod requirement;
mod resolver;

#[cfg(test)]
mod decision_props;

pub use decision::{Admission, Decision, denial, evaluate};
pub use grants::{Authorization, Grant, Grants, Scope, ScopedGrant, UnknownScope};
pub use requirement::Requirement;
pub use resolver::{GrantsResolver, InMemoryGrants};
