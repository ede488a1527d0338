//! Infrastructure Layer
//!
//! Database implementations.

pub mod memory;
pub mod postgres;

pub use memory::MemoryDirectoryRepository;
pub use postgres::PgDirectoryRepository;
