//! The allocation engine's public entry point.

use backon::Retryable;
use std::sync::Arc;
use tracing::warn;

use super::actions;
use super::models::{Allocation, Outcome, SequenceRecord, SequenceStatus, SequenceSummary};
use super::{AllocatorError, RetryConfig};
use crate::common::SequenceId;
use crate::kernel::BaseSequenceStore;

/// Hands out gapless sequence numbers and records what became of them.
///
/// Holds no state of its own besides the store handle: status and the
/// counter are read fresh, under lock, on every call. Cheap to clone and
/// safe to share between any number of concurrent callers.
#[derive(Clone)]
pub struct SequenceAllocator {
    store: Arc<dyn BaseSequenceStore>,
    retry: RetryConfig,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn BaseSequenceStore>, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &Arc<dyn BaseSequenceStore> {
        &self.store
    }

    /// `Allocate()`: check out the lowest reclaimed number, or mint a new one.
    ///
    /// Retries transparently on lock contention; every other error is final.
    pub async fn allocate(&self) -> Result<Allocation, AllocatorError> {
        let store = self.store.as_ref();
        (|| async move { actions::allocate(store).await })
            .retry(self.retry.backoff())
            .when(AllocatorError::is_retryable)
            .notify(|err, dur| {
                warn!(
                    operation = "allocate",
                    error = %err,
                    retry_in = ?dur,
                    "sequence transaction contended, retrying"
                );
            })
            .await
    }

    /// `Resolve(id, outcome)`: settle a `Pending` record.
    pub async fn resolve(
        &self,
        id: SequenceId,
        outcome: Outcome,
    ) -> Result<SequenceRecord, AllocatorError> {
        let store = self.store.as_ref();
        (|| async move { actions::resolve(store, id, outcome).await })
            .retry(self.retry.backoff())
            .when(AllocatorError::is_retryable)
            .notify(|err, dur| {
                warn!(
                    operation = "resolve",
                    record_id = %id,
                    error = %err,
                    retry_in = ?dur,
                    "sequence transaction contended, retrying"
                );
            })
            .await
    }

    pub async fn find(&self, id: SequenceId) -> Result<SequenceRecord, AllocatorError> {
        actions::find_record(self.store.as_ref(), id).await
    }

    pub async fn list(
        &self,
        status: Option<SequenceStatus>,
        limit: i64,
    ) -> Result<Vec<SequenceRecord>, AllocatorError> {
        actions::list_records(self.store.as_ref(), status, limit).await
    }

    pub async fn summary(&self) -> Result<SequenceSummary, AllocatorError> {
        actions::summary(self.store.as_ref()).await
    }
}
