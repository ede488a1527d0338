//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod guard;
pub mod list_users;
pub mod login;
pub mod manage_users;
pub mod pagination;
pub mod session;
pub mod validator;

// Re-exports
pub use config::DirectoryConfig;
pub use guard::{AuthorizationGuard, require_owner};
pub use list_users::ListUsersUseCase;
pub use login::{LoginOutput, LoginUseCase};
pub use manage_users::ManageUsersUseCase;
pub use pagination::{PageRequest, PageSlice, paginate};
pub use session::{SessionCodec, SessionResolver};
