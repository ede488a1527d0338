//! Authorization Guard
//!
//! Preconditions shared by the protected endpoints. Authentication always
//! runs before any role or ownership check.

use std::sync::Arc;

use kernel::id::UserId;

use crate::application::config::DirectoryConfig;
use crate::application::session::SessionResolver;
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::error::{DirectoryError, DirectoryResult};

pub struct AuthorizationGuard<U>
where
    U: UserRepository,
{
    resolver: SessionResolver<U>,
}

impl<U> AuthorizationGuard<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: &DirectoryConfig) -> Self {
        Self {
            resolver: SessionResolver::new(user_repo, config),
        }
    }

    /// Any authenticated user
    pub async fn require_session(&self, token: Option<&str>) -> DirectoryResult<User> {
        self.resolver.resolve(token).await
    }

    /// Authenticated administrator
    pub async fn require_admin(&self, token: Option<&str>) -> DirectoryResult<User> {
        let user = self.resolver.resolve(token).await?;

        if !user.is_admin {
            tracing::debug!(user_id = %user.id, "Non-admin rejected from private endpoint");
            return Err(DirectoryError::Forbidden);
        }

        Ok(user)
    }
}

/// Self-service writes are limited to the caller's own record
///
/// Administrators get no bypass here.
pub fn require_owner(caller: &User, target: UserId) -> DirectoryResult<()> {
    if caller.id != target {
        return Err(DirectoryError::NotOwner(target));
    }
    Ok(())
}
