//! Sequence domain - gapless document numbers with reclaim and reuse
//!
//! Architecture:
//!   SequenceAllocator (retry boundary) → actions (one transaction each) → BaseSequenceStore
//!
//! The counter registry mints fresh numbers; the allocation engine prefers the
//! lowest reclaimed number before minting a new one.

pub mod actions;
pub mod allocator;
pub mod error;
pub mod models;
pub mod retry;

pub use allocator::SequenceAllocator;
pub use error::AllocatorError;
pub use models::{
    Allocation, CounterRegistry, Outcome, SequenceNumber, SequenceRecord, SequenceStatus,
    SequenceSummary,
};
pub use retry::RetryConfig;
