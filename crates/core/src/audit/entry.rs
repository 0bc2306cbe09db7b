//! Audit entries as handed to the writer.

use std::fmt;
use std::str::FromStr;

use coreops_shared::types::{DivisionId, UserId};
use coreops_shared::{AppError, AuthContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::scrub::scrub;
use crate::authz::{Authorization, Scope};

/// How significant an audited action is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Routine.
    Low,
    /// Default.
    #[default]
    Medium,
    /// Governance-relevant.
    High,
    /// Security-relevant.
    Critical,
}

impl Severity {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = AuditEntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(AuditEntryError::UnknownSeverity(s.to_string())),
        }
    }
}

/// Entity types with audit meaning across modules.
pub mod entity {
    /// Month-close records.
    pub const MONTH_CLOSE: &str = "MONTH_CLOSE";
    /// The audit trail itself (exports).
    pub const AUDIT_LOG: &str = "AUDIT_LOG";
    /// Governance projects.
    pub const PROJECT: &str = "PROJECT";
    /// Administrative user accounts.
    pub const ADMIN_USER: &str = "ADMIN_USER";
}

/// Action names with audit meaning across modules.
pub mod action {
    /// Entity created.
    pub const CREATE: &str = "CREATE";
    /// Entity updated.
    pub const UPDATE: &str = "UPDATE";
    /// Entity activated or deactivated.
    pub const STATUS_CHANGE: &str = "STATUS_CHANGE";
    /// Month closed.
    pub const CLOSE: &str = "CLOSE";
    /// Month reopened.
    pub const REOPEN: &str = "REOPEN";
    /// Data exported.
    pub const EXPORT: &str = "EXPORT";
}

const REASON_REQUIRED: [(&str, &str); 5] = [
    (entity::MONTH_CLOSE, action::CLOSE),
    (entity::MONTH_CLOSE, action::REOPEN),
    (entity::ADMIN_USER, action::CREATE),
    (entity::AUDIT_LOG, action::EXPORT),
    (entity::PROJECT, action::STATUS_CHANGE),
];

/// Whether `action` on `entity_type` must carry a human reason.
#[must_use]
pub fn requires_reason(entity_type: &str, action: &str) -> bool {
    REASON_REQUIRED.iter().any(|(e, a)| {
        e.eq_ignore_ascii_case(entity_type) && a.eq_ignore_ascii_case(action)
    })
}

/// Trims a reason, treating blank input as absent.
#[must_use]
pub fn normalize_reason(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

/// An audit entry that cannot be written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditEntryError {
    /// No request id was threaded through.
    #[error("audit entry is missing a request id")]
    MissingRequestId,

    /// Entity type is blank.
    #[error("audit entry is missing an entity type")]
    MissingEntityType,

    /// Action is blank.
    #[error("audit entry is missing an action")]
    MissingAction,

    /// Sensitive action without a reason.
    #[error("Reason is required for {entity_type} {action}")]
    ReasonRequired {
        /// Entity type of the entry.
        entity_type: String,
        /// Action of the entry.
        action: String,
    },

    /// Severity string not understood.
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),
}

impl From<AuditEntryError> for AppError {
    fn from(err: AuditEntryError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Who performed an audited action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditActor {
    /// Acting user.
    pub id: UserId,
    /// Role label from the access token.
    pub role: Option<String>,
    /// Roles resolved by the permission gate.
    pub roles: Vec<String>,
    /// Email from the access token.
    pub email: Option<String>,
}

impl AuditActor {
    /// Actor from an authenticated request, with roles if it was authorized.
    #[must_use]
    pub fn from_request(auth: &AuthContext, authorization: Option<&Authorization>) -> Self {
        Self {
            id: auth.user_id,
            role: auth.role().map(str::to_string),
            roles: authorization.map(|a| a.roles.clone()).unwrap_or_default(),
            email: auth.email().map(str::to_string),
        }
    }

    /// Actor known only by id.
    #[must_use]
    pub fn user(id: UserId) -> Self {
        Self {
            id,
            role: None,
            roles: Vec::new(),
            email: None,
        }
    }
}

/// One audit record to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    /// Correlates the entry with logs and the HTTP exchange.
    pub request_id: String,
    /// Kind of entity changed.
    pub entity_type: String,
    /// Changed entity, if it has an id.
    pub entity_id: Option<Uuid>,
    /// What happened.
    pub action: String,
    /// Significance.
    pub severity: Severity,
    /// Scope of the change.
    pub scope: Option<Scope>,
    /// Division of the change.
    pub division_id: Option<DivisionId>,
    /// State before the change.
    pub before: Option<Value>,
    /// State after the change.
    pub after: Option<Value>,
    /// Free-form context.
    pub meta: Option<Value>,
    /// Who did it.
    pub actor: AuditActor,
    /// Why, for sensitive actions.
    pub reason: Option<String>,
}

impl NewAuditEntry {
    /// Starts an entry.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        actor: AuditActor,
        entity_type: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            entity_type: entity_type.into(),
            entity_id: None,
            action: action.into(),
            severity: Severity::default(),
            scope: None,
            division_id: None,
            before: None,
            after: None,
            meta: None,
            actor,
            reason: None,
        }
    }

    /// Sets the entity id.
    #[must_use]
    pub fn entity(mut self, id: Uuid) -> Self {
        self.entity_id = Some(id);
        self
    }

    /// Sets the severity.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets scope and division.
    #[must_use]
    pub fn scoped(mut self, scope: Scope, division_id: Option<DivisionId>) -> Self {
        self.scope = Some(scope);
        self.division_id = match scope {
            Scope::Company => None,
            Scope::Division => division_id,
        };
        self
    }

    /// Sets the before image.
    #[must_use]
    pub fn before(mut self, before: Value) -> Self {
        self.before = Some(before);
        self
    }

    /// Sets the after image.
    #[must_use]
    pub fn after(mut self, after: Value) -> Self {
        self.after = Some(after);
        self
    }

    /// Sets the meta payload.
    #[must_use]
    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Sets the reason.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Checks required fields without modifying the entry.
    ///
    /// # Errors
    ///
    /// Returns the first missing field.
    pub fn validate(&self) -> Result<(), AuditEntryError> {
        if self.request_id.trim().is_empty() {
            return Err(AuditEntryError::MissingRequestId);
        }
        if self.entity_type.trim().is_empty() {
            return Err(AuditEntryError::MissingEntityType);
        }
        if self.action.trim().is_empty() {
            return Err(AuditEntryError::MissingAction);
        }
        if requires_reason(&self.entity_type, &self.action)
            && normalize_reason(self.reason.as_deref()).is_none()
        {
            return Err(AuditEntryError::ReasonRequired {
                entity_type: self.entity_type.clone(),
                action: self.action.clone(),
            });
        }
        Ok(())
    }

    /// Validates the entry and returns it ready for persistence: reason
    /// trimmed, sensitive JSON fields masked.
    ///
    /// # Errors
    ///
    /// See [`NewAuditEntry::validate`].
    pub fn prepare(self) -> Result<Self, AuditEntryError> {
        self.validate()?;
        let entity_type = self.entity_type;
        Ok(Self {
            reason: normalize_reason(self.reason.as_deref()),
            before: self.before.map(|v| scrub(&entity_type, v)),
            after: self.after.map(|v| scrub(&entity_type, v)),
            meta: self.meta.map(|v| scrub(&entity_type, v)),
            entity_type,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(entity_type: &str, action: &str) -> NewAuditEntry {
        NewAuditEntry::new("req-1", AuditActor::user(UserId::new()), entity_type, action)
    }

    #[test]
    fn test_defaults() {
        let e = entry(entity::PROJECT, action::UPDATE);
        assert_eq!(e.severity, Severity::Medium);
        assert!(e.validate().is_ok());
    }

    #[test]
    fn test_missing_request_id() {
        let e = NewAuditEntry::new("  ", AuditActor::user(UserId::new()), "PROJECT", "UPDATE");
        assert_eq!(e.validate(), Err(AuditEntryError::MissingRequestId));
    }

    #[test]
    fn test_sensitive_actions_need_reason() {
        for (entity_type, act) in [
            (entity::MONTH_CLOSE, action::CLOSE),
            (entity::MONTH_CLOSE, action::REOPEN),
            (entity::ADMIN_USER, action::CREATE),
            (entity::AUDIT_LOG, action::EXPORT),
        ] {
            let missing = entry(entity_type, act);
            assert!(matches!(
                missing.validate(),
                Err(AuditEntryError::ReasonRequired { .. })
            ));

            let blank = entry(entity_type, act).reason("   ");
            assert!(blank.validate().is_err());

            let given = entry(entity_type, act).reason("Books reconciled");
            assert!(given.validate().is_ok());
        }
    }

    #[test]
    fn test_reason_error_is_validation() {
        let err: AppError = entry(entity::MONTH_CLOSE, action::CLOSE)
            .validate()
            .unwrap_err()
            .into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.public_message(), "Reason is required for MONTH_CLOSE CLOSE");
    }

    #[test]
    fn test_prepare_trims_and_scrubs() {
        let prepared = entry(entity::PROJECT, action::UPDATE)
            .before(json!({"name": "A", "apiToken": "x"}))
            .after(json!({"name": "B"}))
            .reason("  rename  ")
            .prepare()
            .unwrap();

        assert_eq!(prepared.reason.as_deref(), Some("rename"));
        assert_eq!(prepared.before, Some(json!({"name": "A", "apiToken": "[REDACTED]"})));
        assert_eq!(prepared.after, Some(json!({"name": "B"})));
    }

    #[test]
    fn test_company_scope_drops_division() {
        let e = entry(entity::PROJECT, action::CREATE).scoped(Scope::Company, Some(DivisionId::new()));
        assert_eq!(e.division_id, None);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("high".parse::<Severity>(), Ok(Severity::High));
        assert!("urgent".parse::<Severity>().is_err());
    }
}
