//! Resolve action - record what happened to a checked-out number

use tracing::info;

use crate::common::SequenceId;
use crate::domains::sequences::models::{Outcome, SequenceRecord};
use crate::domains::sequences::AllocatorError;
use crate::kernel::BaseSequenceStore;

/// Move a `Pending` record to `Used` (consumed) or `Available` (reclaim).
///
/// Not idempotent: resolving the same record twice fails the second time
/// with `InvalidState`, so a double report is visible to the caller.
pub async fn resolve(
    store: &dyn BaseSequenceStore,
    id: SequenceId,
    outcome: Outcome,
) -> Result<SequenceRecord, AllocatorError> {
    let mut tx = store.begin().await?;

    let record = tx
        .lock_record(id)
        .await?
        .ok_or(AllocatorError::NotFound(id))?;

    let next = record
        .status
        .transition(outcome.target())
        .map_err(|current| AllocatorError::InvalidState { id, current })?;

    let updated = tx.update_status(id, next).await?;
    tx.commit().await?;

    info!(
        record_id = %updated.id,
        number = %updated.number,
        outcome = %outcome,
        status = %updated.status,
        "sequence number resolved"
    );
    Ok(updated)
}
