//! Grant resolution seam.

use std::collections::HashMap;

use async_trait::async_trait;
use coreops_shared::AppResult;
use coreops_shared::types::UserId;

use super::grants::Grants;

/// Loads the grant set of a user.
///
/// Implementations must not cache across calls: a revoked role has to stop
/// admitting requests on the very next check. A user without assignments
/// resolves to [`Grants::empty`], not an error.
#[async_trait]
pub trait GrantsResolver: Send + Sync {
    /// Resolves the current grants of `user_id`.
    async fn grants_for(&self, user_id: UserId) -> AppResult<Grants>;
}

/// Fixed grant sets keyed by user, for wiring gates without storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGrants {
    users: HashMap<UserId, Grants>,
}

impl InMemoryGrants {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `grants` to `user_id`.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId, grants: Grants) -> Self {
        self.users.insert(user_id, grants);
        self
    }
}

#[async_trait]
impl GrantsResolver for InMemoryGrants {
    async fn grants_for(&self, user_id: UserId) -> AppResult<Grants> {
        Ok(self.users.get(&user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::grants::ScopedGrant;

    #[tokio::test]
    async fn test_unknown_user_has_empty_grants() {
        let resolver = InMemoryGrants::new();
        let grants = resolver.grants_for(UserId::new()).await.unwrap();
        assert_eq!(grants, Grants::empty());
    }

    #[tokio::test]
    async fn test_known_user_resolves_grants() {
        let user = UserId::new();
        let grants = Grants::from_scoped(vec![ScopedGrant::company("AUDITOR", "GOV_AUDIT_READ")]);
        let resolver = InMemoryGrants::new().with_user(user, grants.clone());

        assert_eq!(resolver.grants_for(user).await.unwrap(), grants);
    }
}
