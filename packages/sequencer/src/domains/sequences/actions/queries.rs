//! Read-only queries. None of these lock anything.

use crate::common::SequenceId;
use crate::domains::sequences::models::{SequenceRecord, SequenceStatus, SequenceSummary};
use crate::domains::sequences::AllocatorError;
use crate::kernel::BaseSequenceStore;

/// Hard cap on `list_records`, whatever the caller asks for.
pub const MAX_LIST_LIMIT: i64 = 1_000;

pub async fn find_record(
    store: &dyn BaseSequenceStore,
    id: SequenceId,
) -> Result<SequenceRecord, AllocatorError> {
    store
        .find_record(id)
        .await?
        .ok_or(AllocatorError::NotFound(id))
}

/// Records in ascending number order, e.g. `Pending` ones to spot callers
/// that never reported back.
pub async fn list_records(
    store: &dyn BaseSequenceStore,
    status: Option<SequenceStatus>,
    limit: i64,
) -> Result<Vec<SequenceRecord>, AllocatorError> {
    store
        .list_records(status, limit.clamp(0, MAX_LIST_LIMIT))
        .await
}

pub async fn summary(store: &dyn BaseSequenceStore) -> Result<SequenceSummary, AllocatorError> {
    store.summary().await
}
