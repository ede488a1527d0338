//! Manage Users Use Case
//!
//! Create, read, update and delete user records. Uniqueness and reference
//! checks run before any write, so a rejected request leaves the record
//! untouched.

use std::sync::Arc;

use kernel::id::{CityId, UserId};

use crate::application::config::DirectoryConfig;
use crate::application::validator::{
    CreateUserInput, FieldErrors, MSG_EMAIL_TAKEN, UserChanges, msg_unknown_city,
};
use crate::domain::entity::user::{NewUser, User, UserPatch};
use crate::domain::repository::{CityRepository, UserRepository};
use crate::domain::value_object::{
    email::Email,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{DirectoryError, DirectoryResult};

pub struct ManageUsersUseCase<U, C>
where
    U: UserRepository,
    C: CityRepository,
{
    user_repo: Arc<U>,
    city_repo: Arc<C>,
    config: Arc<DirectoryConfig>,
}

impl<U, C> ManageUsersUseCase<U, C>
where
    U: UserRepository,
    C: CityRepository,
{
    pub fn new(user_repo: Arc<U>, city_repo: Arc<C>, config: Arc<DirectoryConfig>) -> Self {
        Self {
            user_repo,
            city_repo,
            config,
        }
    }

    /// Load a user or fail with `UserNotFound`
    pub async fn get(&self, id: UserId) -> DirectoryResult<User> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or(DirectoryError::UserNotFound)
    }

    pub async fn create(&self, input: CreateUserInput) -> DirectoryResult<User> {
        let mut errors = FieldErrors::default();
        self.check_email(&input.email, None, &mut errors).await?;
        self.check_city(input.city, &mut errors).await?;
        let password = match self.hash_password(input.password, &mut errors)? {
            Some(password) if errors.is_empty() => password,
            _ => return Err(DirectoryError::FieldConflict(errors)),
        };

        let user = self
            .user_repo
            .create(NewUser {
                first_name: input.first_name,
                last_name: input.last_name,
                other_name: input.other_name,
                email: input.email,
                password,
                phone: input.phone,
                birthday: input.birthday,
                is_admin: input.is_admin,
                city: input.city,
                additional_info: input.additional_info,
            })
            .await?;

        tracing::info!(user_id = %user.id, is_admin = user.is_admin, "User created");

        Ok(user)
    }

    /// Apply `changes` to `user` and persist the result
    pub async fn update(&self, mut user: User, changes: UserChanges) -> DirectoryResult<User> {
        let mut errors = FieldErrors::default();

        if let Some(email) = &changes.email {
            self.check_email(email, Some(user.id), &mut errors).await?;
        }
        if let Some(city) = changes.city {
            self.check_city(city, &mut errors).await?;
        }
        let password = match changes.password {
            Some(raw) => self.hash_password(raw, &mut errors)?,
            None => None,
        };

        if !errors.is_empty() {
            return Err(DirectoryError::FieldConflict(errors));
        }

        user.apply(UserPatch {
            first_name: changes.first_name,
            last_name: changes.last_name,
            other_name: changes.other_name,
            email: changes.email,
            password,
            phone: changes.phone,
            birthday: changes.birthday,
            is_admin: changes.is_admin,
            city: changes.city,
            additional_info: changes.additional_info,
        });

        self.user_repo.update(&user).await?;

        tracing::info!(user_id = %user.id, "User updated");

        Ok(user)
    }

    pub async fn delete(&self, id: UserId) -> DirectoryResult<()> {
        if !self.user_repo.delete(id).await? {
            return Err(DirectoryError::UserNotFound);
        }

        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    async fn check_email(
        &self,
        email: &Email,
        except: Option<UserId>,
        errors: &mut FieldErrors,
    ) -> DirectoryResult<()> {
        if self.user_repo.email_taken(email.as_str(), except).await? {
            errors.push("email", MSG_EMAIL_TAKEN);
        }
        Ok(())
    }

    async fn check_city(&self, city: Option<CityId>, errors: &mut FieldErrors) -> DirectoryResult<()> {
        if let Some(id) = city {
            if self.city_repo.find_city(id).await?.is_none() {
                errors.push("city", msg_unknown_city(id.value()));
            }
        }
        Ok(())
    }

    /// `Ok(None)` with a field error when the password is rejected
    fn hash_password(
        &self,
        raw: String,
        errors: &mut FieldErrors,
    ) -> DirectoryResult<Option<UserPassword>> {
        let raw = match RawPassword::new(raw) {
            Ok(raw) => raw,
            Err(e) => {
                errors.push("password", e.message().to_string());
                return Ok(None);
            }
        };

        let hashed = UserPassword::from_raw(&raw, self.config.pepper(), self.config.hash_cost)?;
        Ok(Some(hashed))
    }
}
