//! In-Memory Repository
//!
//! Process-local store used when no database is configured and in tests.
//! A single lock guards users and cities together so the email uniqueness
//! check and the write happen atomically.

use std::collections::BTreeMap;
use std::sync::Arc;

use kernel::id::{CityId, UserId};
use tokio::sync::RwLock;

use crate::application::validator::{FieldErrors, MSG_EMAIL_TAKEN};
use crate::domain::entity::{
    city::City,
    user::{NewUser, User},
};
use crate::domain::repository::{CityRepository, UserRepository};
use crate::error::{DirectoryError, DirectoryResult};

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, User>,
    cities: BTreeMap<CityId, City>,
    last_user_id: i64,
    last_city_id: i64,
}

impl State {
    fn email_owner(&self, email: &str) -> Option<UserId> {
        self.users
            .values()
            .find(|user| user.email.as_str() == email)
            .map(|user| user.id)
    }
}

fn email_conflict() -> DirectoryError {
    let mut errors = FieldErrors::default();
    errors.push("email", MSG_EMAIL_TAKEN);
    DirectoryError::FieldConflict(errors)
}

/// In-memory directory repository
#[derive(Clone, Default)]
pub struct MemoryDirectoryRepository {
    state: Arc<RwLock<State>>,
}

impl MemoryDirectoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for MemoryDirectoryRepository {
    async fn create(&self, user: NewUser) -> DirectoryResult<User> {
        let mut state = self.state.write().await;

        if state.email_owner(user.email.as_str()).is_some() {
            return Err(email_conflict());
        }

        state.last_user_id += 1;
        let user = user.into_user(UserId::new(state.last_user_id));
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> DirectoryResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .email_owner(email)
            .and_then(|id| state.users.get(&id).cloned()))
    }

    async fn list_all(&self) -> DirectoryResult<Vec<User>> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn email_taken(&self, email: &str, except: Option<UserId>) -> DirectoryResult<bool> {
        let owner = self.state.read().await.email_owner(email);
        Ok(owner.is_some_and(|id| Some(id) != except))
    }

    async fn update(&self, user: &User) -> DirectoryResult<()> {
        let mut state = self.state.write().await;

        if state
            .email_owner(user.email.as_str())
            .is_some_and(|owner| owner != user.id)
        {
            return Err(email_conflict());
        }

        let slot = state
            .users
            .get_mut(&user.id)
            .ok_or(DirectoryError::UserNotFound)?;
        *slot = user.clone();

        Ok(())
    }

    async fn delete(&self, id: UserId) -> DirectoryResult<bool> {
        Ok(self.state.write().await.users.remove(&id).is_some())
    }
}

// ============================================================================
// City Repository Implementation
// ============================================================================

impl CityRepository for MemoryDirectoryRepository {
    async fn create_city(&self, name: &str) -> DirectoryResult<City> {
        let mut state = self.state.write().await;

        state.last_city_id += 1;
        let city = City {
            id: CityId::new(state.last_city_id),
            name: name.to_string(),
        };
        state.cities.insert(city.id, city.clone());

        Ok(city)
    }

    async fn find_city(&self, id: CityId) -> DirectoryResult<Option<City>> {
        Ok(self.state.read().await.cities.get(&id).cloned())
    }

    async fn list_cities(&self) -> DirectoryResult<Vec<City>> {
        Ok(self.state.read().await.cities.values().cloned().collect())
    }

    async fn delete_city(&self, id: CityId) -> DirectoryResult<bool> {
        let mut state = self.state.write().await;

        if state.cities.remove(&id).is_none() {
            return Ok(false);
        }

        for user in state.users.values_mut() {
            if user.city == Some(id) {
                user.city = None;
            }
        }

        Ok(true)
    }
}
