//! List Users Use Case
//!
//! Paginated listing over every user in ascending id order.

use std::sync::Arc;

use crate::application::pagination::{PageRequest, PageSlice, paginate};
use crate::domain::entity::{city::City, user::User};
use crate::domain::repository::{CityRepository, UserRepository};
use crate::error::DirectoryResult;

pub struct ListUsersUseCase<U, C>
where
    U: UserRepository,
    C: CityRepository,
{
    user_repo: Arc<U>,
    city_repo: Arc<C>,
}

impl<U, C> ListUsersUseCase<U, C>
where
    U: UserRepository,
    C: CityRepository,
{
    pub fn new(user_repo: Arc<U>, city_repo: Arc<C>) -> Self {
        Self {
            user_repo,
            city_repo,
        }
    }

    /// One page of users
    pub async fn execute(&self, request: PageRequest) -> DirectoryResult<PageSlice<User>> {
        let users = self.user_repo.list_all().await?;
        paginate(users, request)
    }

    /// One page of users plus every city as a hint
    pub async fn execute_with_hint(
        &self,
        request: PageRequest,
    ) -> DirectoryResult<(PageSlice<User>, Vec<City>)> {
        let slice = self.execute(request).await?;
        let cities = self.city_repo.list_cities().await?;
        Ok((slice, cities))
    }
}
