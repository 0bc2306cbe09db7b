//! Authentication types carried by every authenticated request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::UserId;

/// JWT claims for access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Primary role label, informational only. Grants are resolved from storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Email of the subject, if the identity provider includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        role: Option<&str>,
        issuer: &str,
        audience: &str,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            role: role.map(str::to_string),
            email: None,
            iss: issuer.to_string(),
            aud: audience.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }
}

/// The authenticated identity attached to a request.
///
/// Inserted exactly once by the authentication middleware; everything
/// downstream (permission gate, handlers, audit actor fields) reads it from
/// the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// The acting user.
    pub user_id: UserId,
    /// The verified token claims.
    pub claims: Claims,
}

impl AuthContext {
    /// Builds a context from verified claims.
    #[must_use]
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: UserId::from_uuid(claims.sub),
            claims,
        }
    }

    /// Role label carried by the token, if any.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.claims.role.as_deref()
    }

    /// Email carried by the token, if any.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.claims.email.as_deref()
    }
}
