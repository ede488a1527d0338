//! API DTOs (Data Transfer Objects)
//!
//! Response projections of the user record. Field names are snake_case on
//! the wire.

use chrono::NaiveDate;
use kernel::id::{CityId, UserId};
use serde::Serialize;

use crate::application::pagination::PageSlice;
use crate::domain::entity::{city::City, user::User};

// ============================================================================
// User projections
// ============================================================================

/// Listing entry
#[derive(Debug, Clone, Serialize)]
pub struct ShortUserResponse {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for ShortUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.to_string(),
        }
    }
}

/// Login and current-user response
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUserResponse {
    pub first_name: String,
    pub last_name: String,
    pub other_name: String,
    pub email: String,
    pub phone: String,
    pub birthday: Option<NaiveDate>,
    pub is_admin: bool,
}

impl From<&User> for CurrentUserResponse {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            other_name: user.other_name.clone(),
            email: user.email.to_string(),
            phone: user.phone.clone(),
            birthday: user.birthday,
            is_admin: user.is_admin,
        }
    }
}

/// Self-update response
#[derive(Debug, Clone, Serialize)]
pub struct UpdateUserResponse {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub other_name: String,
    pub email: String,
    pub phone: String,
    pub birthday: Option<NaiveDate>,
}

impl From<&User> for UpdateUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            other_name: user.other_name.clone(),
            email: user.email.to_string(),
            phone: user.phone.clone(),
            birthday: user.birthday,
        }
    }
}

/// Administrator view of a single user
#[derive(Debug, Clone, Serialize)]
pub struct PrivateDetailUserResponse {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub other_name: String,
    pub email: String,
    pub phone: String,
    pub birthday: Option<NaiveDate>,
    pub is_admin: bool,
    pub city: Option<CityId>,
    pub additional_info: String,
}

impl From<&User> for PrivateDetailUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            other_name: user.other_name.clone(),
            email: user.email.to_string(),
            phone: user.phone.clone(),
            birthday: user.birthday,
            is_admin: user.is_admin,
            city: user.city,
            additional_info: user.additional_info.clone(),
        }
    }
}

// ============================================================================
// Listing
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    /// Number of entries in this page
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CityHint {
    pub id: CityId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HintMeta {
    pub city: Vec<CityHint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListMeta {
    pub pagination: PaginationMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<HintMeta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsersListResponse {
    pub data: Vec<ShortUserResponse>,
    pub meta: ListMeta,
}

impl UsersListResponse {
    pub fn new(slice: &PageSlice<User>, cities: Option<&[City]>) -> Self {
        Self {
            data: slice.items.iter().map(ShortUserResponse::from).collect(),
            meta: ListMeta {
                pagination: PaginationMeta {
                    total: slice.total,
                    page: slice.page,
                    size: slice.size,
                },
                hint: cities.map(|cities| HintMeta {
                    city: cities
                        .iter()
                        .map(|city| CityHint {
                            id: city.id,
                            name: city.name.clone(),
                        })
                        .collect(),
                }),
            },
        }
    }
}
