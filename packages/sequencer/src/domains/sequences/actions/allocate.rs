//! Allocate action - hand out the next sequence number

use tracing::info;

use crate::domains::sequences::models::{Allocation, SequenceRecord, SequenceStatus};
use crate::domains::sequences::AllocatorError;
use crate::kernel::BaseSequenceStore;

/// Check out one number: the lowest reclaimed one if any, otherwise a fresh one.
///
/// Both paths share one transaction. The counter row is locked first and
/// acts as the allocation gate: concurrent callers queue on it, so the
/// "is anything available?" check and the counter advance can never
/// interleave with another allocation.
pub async fn allocate(store: &dyn BaseSequenceStore) -> Result<Allocation, AllocatorError> {
    let mut tx = store.begin().await?;
    let counter = tx.lock_counter().await?;

    if let Some(candidate) = tx.lock_oldest_available().await? {
        let status = candidate
            .status
            .transition(SequenceStatus::Pending)
            .map_err(|current| AllocatorError::InvalidState {
                id: candidate.id,
                current,
            })?;
        let record = tx.update_status(candidate.id, status).await?;
        tx.commit().await?;

        info!(
            record_id = %record.id,
            number = %record.number,
            reused = true,
            "sequence number allocated"
        );
        return Ok(Allocation::reused(record));
    }

    let number = counter.advance_and_reserve(tx.as_mut()).await?;
    let record = tx.insert_record(&SequenceRecord::pending(number)).await?;
    tx.commit().await?;

    info!(
        record_id = %record.id,
        number = %record.number,
        reused = false,
        "sequence number allocated"
    );
    Ok(Allocation::fresh(record))
}
