//! Typed ids for the persisted entities.

pub use super::id::Id;

/// Marker type for sequence records.
pub struct Sequence;

/// Typed ID for a `SequenceRecord`.
pub type SequenceId = Id<Sequence>;
