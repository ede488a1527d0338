//! Directory Router

use axum::{
    Router,
    routing::{get, patch, post},
};
use std::sync::Arc;

use crate::application::config::DirectoryConfig;
use crate::domain::repository::{CityRepository, UserRepository};
use crate::infra::postgres::PgDirectoryRepository;
use crate::presentation::handlers::{self, DirectoryAppState};

/// Create the Directory router with PostgreSQL repository
pub fn directory_router(repo: PgDirectoryRepository, config: DirectoryConfig) -> Router {
    directory_router_generic(repo, config)
}

/// Create a generic Directory router for any repository implementation
pub fn directory_router_generic<R>(repo: R, config: DirectoryConfig) -> Router
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    let state = DirectoryAppState {
        repo: Arc::new(repo),
        config: Arc::new(config),
    };

    Router::new()
        .route("/login", post(handlers::login::<R>))
        .route("/logout", get(handlers::logout::<R>))
        .route("/users", get(handlers::list_users::<R>))
        .route("/users/{id}", patch(handlers::update_self::<R>))
        .route("/current", get(handlers::current_user::<R>))
        .route(
            "/private/users",
            get(handlers::admin_list_users::<R>).post(handlers::admin_create_user::<R>),
        )
        .route(
            "/private/users/{id}",
            get(handlers::admin_get_user::<R>)
                .patch(handlers::admin_update_user::<R>)
                .delete(handlers::admin_delete_user::<R>),
        )
        .with_state(state)
}
