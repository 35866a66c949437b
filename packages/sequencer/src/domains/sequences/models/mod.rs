pub mod counter;
pub mod number;
pub mod record;
pub mod status;
pub mod summary;

pub use counter::CounterRegistry;
pub use number::{ParseSequenceNumberError, SequenceNumber};
pub use record::{Allocation, SequenceRecord};
pub use status::{Outcome, SequenceStatus};
pub use summary::SequenceSummary;
