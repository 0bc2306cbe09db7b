//! Capability tokens.
//!
//! A capability authorizes exactly one follow-up action (downloading one
//! generated artifact) without re-running the permission gate. The envelope
//! is a compact HS256 JWS with a versioned claim set; expiry is checked in
//! milliseconds against an explicit clock so callers and tests agree on `now`.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::types::UserId;

/// Current claim-set version.
pub const CAPABILITY_VERSION: u8 = 1;

/// Audience of export download capabilities.
pub const EXPORT_DOWNLOAD_AUDIENCE: &str = "export-download";

/// Errors that can occur while issuing or verifying a capability.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// Token could not be parsed or is missing claims.
    #[error("malformed capability token")]
    Malformed,

    /// Signature does not match the payload.
    #[error("invalid capability signature")]
    BadSignature,

    /// Claim-set version is not understood.
    #[error("unsupported capability version {0}")]
    UnsupportedVersion(u8),

    /// Token was issued for a different purpose.
    #[error("capability issued for another purpose")]
    WrongAudience,

    /// `exp` is in the past.
    #[error("capability token expired")]
    Expired,

    /// Token is bound to another actor.
    #[error("capability bound to another user")]
    ActorMismatch,

    /// Token could not be signed.
    #[error("failed to sign capability: {0}")]
    Signing(String),
}

impl From<CapabilityError> for AppError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::Expired => Self::Forbidden("Token expired".to_string()),
            CapabilityError::ActorMismatch => {
                Self::Forbidden("Token not valid for this user".to_string())
            }
            CapabilityError::Signing(msg) => Self::Internal(msg),
            CapabilityError::Malformed
            | CapabilityError::BadSignature
            | CapabilityError::UnsupportedVersion(_)
            | CapabilityError::WrongAudience => Self::Forbidden("Invalid token".to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CapabilityClaims {
    ver: u8,
    aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<Uuid>,
    rel_path: String,
    file_name: String,
    exp_ms: i64,
    iat_ms: i64,
}

/// What a verified capability grants access to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityGrant {
    /// Artifact path relative to the export root.
    pub rel_path: String,
    /// File name presented to the downloader.
    pub file_name: String,
    /// Expiry in epoch milliseconds.
    pub expires_at_ms: i64,
}

/// Issues and verifies capability tokens.
#[derive(Clone)]
pub struct CapabilityService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for CapabilityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityService")
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl CapabilityService {
    /// Creates a service signing with the given secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issues a download capability for `rel_path` that expires at `expires_at_ms`.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError::Signing` if the token cannot be encoded.
    pub fn issue(
        &self,
        rel_path: &str,
        file_name: &str,
        expires_at_ms: i64,
        actor: Option<UserId>,
    ) -> Result<String, CapabilityError> {
        let claims = CapabilityClaims {
            ver: CAPABILITY_VERSION,
            aud: EXPORT_DOWNLOAD_AUDIENCE.to_string(),
            sub: actor.map(UserId::into_inner),
            rel_path: rel_path.to_string(),
            file_name: file_name.to_string(),
            exp_ms: expires_at_ms,
            iat_ms: Utc::now().timestamp_millis(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CapabilityError::Signing(e.to_string()))
    }

    /// Verifies a capability against the current time.
    ///
    /// # Errors
    ///
    /// See [`CapabilityService::verify_at`].
    pub fn verify(
        &self,
        token: &str,
        expected_actor: Option<UserId>,
    ) -> Result<CapabilityGrant, CapabilityError> {
        self.verify_at(token, expected_actor, Utc::now().timestamp_millis())
    }

    /// Verifies a capability as of `now_ms`.
    ///
    /// The signature is checked first (constant-time HMAC comparison inside
    /// `jsonwebtoken`), then version and audience, then expiry, then the
    /// actor binding. A token without an actor is not bound to anyone.
    ///
    /// # Errors
    ///
    /// Returns the first check that failed.
    pub fn verify_at(
        &self,
        token: &str,
        expected_actor: Option<UserId>,
        now_ms: i64,
    ) -> Result<CapabilityGrant, CapabilityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let claims = decode::<CapabilityClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => CapabilityError::BadSignature,
                _ => CapabilityError::Malformed,
            })?;

        if claims.ver != CAPABILITY_VERSION {
            return Err(CapabilityError::UnsupportedVersion(claims.ver));
        }
        if claims.aud != EXPORT_DOWNLOAD_AUDIENCE {
            return Err(CapabilityError::WrongAudience);
        }
        if claims.rel_path.is_empty() || claims.file_name.is_empty() {
            return Err(CapabilityError::Malformed);
        }
        if claims.exp_ms < now_ms {
            return Err(CapabilityError::Expired);
        }
        if let (Some(bound), Some(expected)) = (claims.sub, expected_actor)
            && bound != expected.into_inner()
        {
            return Err(CapabilityError::ActorMismatch);
        }

        Ok(CapabilityGrant {
            rel_path: claims.rel_path,
            file_name: claims.file_name,
            expires_at_ms: claims.exp_ms,
        })
    }
}

#[cfg(test)]
#[path = "capability_tests.rs"]
mod tests;
