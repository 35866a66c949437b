// Trait definitions for the durable store
//
// These are INFRASTRUCTURE traits only - no business logic.
// Which record to recycle, when the counter overflows and which status
// transitions are legal are decided in domains/sequences, on top of these.
//
// Naming convention: Base* for trait names (e.g., BaseSequenceStore)

use async_trait::async_trait;

use crate::common::SequenceId;
use crate::domains::sequences::{
    AllocatorError, CounterRegistry, SequenceNumber, SequenceRecord, SequenceStatus,
    SequenceSummary,
};

// =============================================================================
// Sequence Store Trait (Infrastructure - durable, transactional storage)
// =============================================================================

#[async_trait]
pub trait BaseSequenceStore: Send + Sync {
    /// Open a transaction. Dropping it without `commit` rolls everything back.
    async fn begin(&self) -> Result<Box<dyn BaseSequenceTx>, AllocatorError>;

    /// Read a record without locking it.
    async fn find_record(&self, id: SequenceId) -> Result<Option<SequenceRecord>, AllocatorError>;

    /// Records ordered by ascending number, optionally filtered by status.
    async fn list_records(
        &self,
        status: Option<SequenceStatus>,
        limit: i64,
    ) -> Result<Vec<SequenceRecord>, AllocatorError>;

    async fn summary(&self) -> Result<SequenceSummary, AllocatorError>;
}

/// A single open transaction.
///
/// Every `lock_*` call holds its row exclusively until `commit` or drop.
#[async_trait]
pub trait BaseSequenceTx: Send {
    /// Lock the counter registry row.
    async fn lock_counter(&mut self) -> Result<CounterRegistry, AllocatorError>;

    /// Persist a new `last_issued`. Only a one-step advance is accepted.
    async fn save_counter(
        &mut self,
        last_issued: SequenceNumber,
    ) -> Result<CounterRegistry, AllocatorError>;

    /// Lock the lowest-numbered `Available` record, if any.
    async fn lock_oldest_available(&mut self) -> Result<Option<SequenceRecord>, AllocatorError>;

    async fn lock_record(&mut self, id: SequenceId)
        -> Result<Option<SequenceRecord>, AllocatorError>;

    async fn insert_record(&mut self, record: &SequenceRecord)
        -> Result<SequenceRecord, AllocatorError>;

    /// Write a new status and refresh `updated_at`.
    async fn update_status(
        &mut self,
        id: SequenceId,
        status: SequenceStatus,
    ) -> Result<SequenceRecord, AllocatorError>;

    /// Make every write of this transaction durable. The transaction is
    /// finished afterwards; further calls fail.
    async fn commit(&mut self) -> Result<(), AllocatorError>;
}
