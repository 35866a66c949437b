//! Kernel module - storage infrastructure behind the allocator.

pub mod postgres_store;
pub mod test_dependencies;
pub mod traits;

pub use postgres_store::PostgresSequenceStore;
pub use test_dependencies::InMemorySequenceStore;
pub use traits::*;
