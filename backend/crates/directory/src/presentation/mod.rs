//! Presentation Layer
//!
//! HTTP handlers, DTOs, and router.

pub mod dto;
pub mod handlers;
pub mod router;

pub use handlers::DirectoryAppState;
pub use router::{directory_router, directory_router_generic};
