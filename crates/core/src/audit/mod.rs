//! Audit entries and the masking applied before they are persisted.
//!
//! Entries are assembled with [`NewAuditEntry`] and written by the database
//! layer inside the transaction of the mutation they describe.

mod entry;
mod scrub;

pub use entry::{
    AuditActor, AuditEntryError, NewAuditEntry, Severity, action, entity, normalize_reason,
    requires_reason,
};
pub use scrub::scrub;
