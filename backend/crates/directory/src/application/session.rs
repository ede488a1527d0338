//! Session Resolution
//!
//! A session is not stored: the cookie carries the user id, optionally
//! signed with the session secret. Resolving a token means decoding it and
//! loading the user it names.

use std::sync::Arc;

use kernel::id::UserId;
use platform::crypto::{from_base64_url, hmac_sha256, to_base64_url, verify_hmac_sha256};

use crate::application::config::{DirectoryConfig, TokenMode};
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::error::{DirectoryError, DirectoryResult};

/// Encodes user ids into cookie values and back
#[derive(Clone)]
pub struct SessionCodec {
    mode: TokenMode,
    secret: [u8; 32],
}

impl SessionCodec {
    pub fn new(mode: TokenMode, secret: [u8; 32]) -> Self {
        Self { mode, secret }
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self::new(config.token_mode, config.session_secret)
    }

    /// Token for `id`
    pub fn issue(&self, id: UserId) -> String {
        let id = id.to_string();
        match self.mode {
            TokenMode::Plain => id,
            TokenMode::Signed => {
                let signature = hmac_sha256(&self.secret, id.as_bytes());
                format!("{}.{}", id, to_base64_url(&signature))
            }
        }
    }

    /// User id named by `token`, if the token is well formed and authentic
    pub fn decode(&self, token: &str) -> Option<UserId> {
        match self.mode {
            TokenMode::Plain => token.parse().ok(),
            TokenMode::Signed => {
                let (id, signature_b64) = token.split_once('.')?;
                let signature = from_base64_url(signature_b64).ok()?;

                if !verify_hmac_sha256(&self.secret, id.as_bytes(), &signature) {
                    return None;
                }

                id.parse().ok()
            }
        }
    }
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("mode", &self.mode)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Maps an inbound session token to a user
pub struct SessionResolver<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    codec: SessionCodec,
}

impl<U> SessionResolver<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: &DirectoryConfig) -> Self {
        Self {
            user_repo,
            codec: SessionCodec::from_config(config),
        }
    }

    /// Resolve the session token to its user
    ///
    /// No side effects; resolving the same token twice yields the same result.
    pub async fn resolve(&self, token: Option<&str>) -> DirectoryResult<User> {
        let token = token.ok_or(DirectoryError::NoToken)?;

        let id = self
            .codec
            .decode(token)
            .ok_or(DirectoryError::UnknownSession)?;

        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or(DirectoryError::UnknownSession)
    }
}
