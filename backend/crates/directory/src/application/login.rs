//! Login Use Case
//!
//! Checks credentials and issues a session token.

use std::sync::Arc;

use crate::application::config::DirectoryConfig;
use crate::application::session::SessionCodec;
use crate::application::validator::LoginCredentials;
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::user_password::RawPassword;
use crate::error::{DirectoryError, DirectoryResult};

/// Login output
pub struct LoginOutput {
    pub user: User,
    /// Session token for cookie
    pub session_token: String,
}

/// Login use case
pub struct LoginUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    config: Arc<DirectoryConfig>,
}

impl<U> LoginUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: Arc<DirectoryConfig>) -> Self {
        Self { user_repo, config }
    }

    pub async fn execute(&self, credentials: LoginCredentials) -> DirectoryResult<LoginOutput> {
        let login = credentials.login.ok_or(DirectoryError::UnknownLogin)?;

        let user = self
            .user_repo
            .find_by_email(login.trim())
            .await?
            .ok_or(DirectoryError::UnknownLogin)?;

        let raw_password = credentials
            .password
            .and_then(|password| RawPassword::new(password).ok())
            .ok_or(DirectoryError::WrongPassword)?;

        if !user.password.verify(&raw_password, self.config.pepper()) {
            return Err(DirectoryError::WrongPassword);
        }

        let session_token = SessionCodec::from_config(&self.config).issue(user.id);

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutput {
            user,
            session_token,
        })
    }
}
