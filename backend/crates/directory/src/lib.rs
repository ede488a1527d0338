//! User Directory Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Session resolution, guards, validation, pagination, use cases
//! - `infra/` - PostgreSQL and in-memory store implementations
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Login with email + password, session carried in the `userid` cookie
//! - Self-service tier: listing, current user, updating one's own record
//! - Administrator tier: listing with city hints, create, read, update, delete
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optional application-wide pepper
//! - Session tokens are HMAC-signed user ids (plain ids available for compatibility)
//! - Authentication always runs before role and ownership checks

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::{DirectoryConfig, TokenMode};
pub use error::{DirectoryError, DirectoryResult};
pub use infra::memory::MemoryDirectoryRepository;
pub use infra::postgres::PgDirectoryRepository;
pub use presentation::router::{directory_router, directory_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
