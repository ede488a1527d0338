//! User Entity
//!
//! A directory record. Identity is the store-assigned integer id; the email
//! is the unique login.

use chrono::NaiveDate;
use kernel::id::{CityId, UserId};

use crate::domain::value_object::{email::Email, user_password::UserPassword};

/// User entity
#[derive(Debug, Clone)]
pub struct User {
    /// Store-assigned identifier (ascending, immutable)
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub other_name: String,
    /// Unique login
    pub email: Email,
    pub password: UserPassword,
    pub phone: String,
    pub birthday: Option<NaiveDate>,
    pub is_admin: bool,
    /// Weak reference; cleared when the city is deleted
    pub city: Option<CityId>,
    pub additional_info: String,
}

impl User {
    /// Apply a partial update in place
    ///
    /// Only fields present in the patch change.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(v) = patch.first_name {
            self.first_name = v;
        }
        if let Some(v) = patch.last_name {
            self.last_name = v;
        }
        if let Some(v) = patch.other_name {
            self.other_name = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.password {
            self.password = v;
        }
        if let Some(v) = patch.phone {
            self.phone = v;
        }
        if let Some(v) = patch.birthday {
            self.birthday = v;
        }
        if let Some(v) = patch.is_admin {
            self.is_admin = v;
        }
        if let Some(v) = patch.city {
            self.city = v;
        }
        if let Some(v) = patch.additional_info {
            self.additional_info = v;
        }
    }
}

/// User data before the store assigns an id
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub other_name: String,
    pub email: Email,
    pub password: UserPassword,
    pub phone: String,
    pub birthday: Option<NaiveDate>,
    pub is_admin: bool,
    pub city: Option<CityId>,
    pub additional_info: String,
}

impl NewUser {
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            other_name: self.other_name,
            email: self.email,
            password: self.password,
            phone: self.phone,
            birthday: self.birthday,
            is_admin: self.is_admin,
            city: self.city,
            additional_info: self.additional_info,
        }
    }
}

/// Partial update
///
/// The outer `Option` means "field supplied"; for nullable columns the inner
/// `Option` is the new value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub other_name: Option<String>,
    pub email: Option<Email>,
    pub password: Option<UserPassword>,
    pub phone: Option<String>,
    pub birthday: Option<Option<NaiveDate>>,
    pub is_admin: Option<bool>,
    pub city: Option<Option<CityId>>,
    pub additional_info: Option<String>,
}
