//! Sequence domain actions - business logic functions
//!
//! Each mutating action runs exactly one transaction against the store and
//! never retries; retrying on contention is the allocator's job.

mod allocate;
mod queries;
mod resolve;

pub use allocate::allocate;
pub use queries::{find_record, list_records, summary};
pub use resolve::resolve;
