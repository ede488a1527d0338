//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infrastructure
//! layer.

use kernel::id::{CityId, UserId};

use crate::domain::entity::{
    city::City,
    user::{NewUser, User},
};
use crate::error::DirectoryResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert a user and return it with its assigned id
    ///
    /// Fails with `FieldConflict` if the email is already taken.
    async fn create(&self, user: NewUser) -> DirectoryResult<User>;

    /// Find user by ID
    async fn find_by_id(&self, id: UserId) -> DirectoryResult<Option<User>>;

    /// Find user by exact email
    async fn find_by_email(&self, email: &str) -> DirectoryResult<Option<User>>;

    /// Every user, ascending by id
    async fn list_all(&self) -> DirectoryResult<Vec<User>>;

    /// Check whether a user other than `except` owns `email`
    async fn email_taken(&self, email: &str, except: Option<UserId>) -> DirectoryResult<bool>;

    /// Replace the stored record with `user`
    async fn update(&self, user: &User) -> DirectoryResult<()>;

    /// Hard delete; returns false when nothing was removed
    async fn delete(&self, id: UserId) -> DirectoryResult<bool>;
}

/// City repository trait
#[trait_variant::make(CityRepository: Send)]
pub trait LocalCityRepository {
    /// Insert a city
    async fn create_city(&self, name: &str) -> DirectoryResult<City>;

    /// Find city by ID
    async fn find_city(&self, id: CityId) -> DirectoryResult<Option<City>>;

    /// Every city, ascending by id
    async fn list_cities(&self) -> DirectoryResult<Vec<City>>;

    /// Delete a city; users referencing it lose the reference
    async fn delete_city(&self, id: CityId) -> DirectoryResult<bool>;
}
