//! City Entity
//!
//! Reference data attached to users. Cities are seeded at startup and never
//! owned by a user.

use kernel::id::CityId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct City {
    pub id: CityId,
    pub name: String,
}
