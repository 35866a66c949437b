// TestDependencies - in-memory store for tests
//
// InMemorySequenceStore honours the same transactional contract as the
// PostgreSQL store: one transaction at a time holds the whole state (a
// stricter form of row locking), writes are staged and only published on
// commit, and dropping a transaction discards them.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{BaseSequenceStore, BaseSequenceTx};
use crate::common::SequenceId;
use crate::domains::sequences::{
    AllocatorError, CounterRegistry, SequenceNumber, SequenceRecord, SequenceStatus,
    SequenceSummary,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    counter: CounterRegistry,
    records: HashMap<SequenceId, SequenceRecord>,
}

impl MemoryState {
    fn sorted_records(&self) -> Vec<SequenceRecord> {
        let mut records: Vec<_> = self.records.values().cloned().collect();
        records.sort_by_key(|r| r.number);
        records
    }
}

// =============================================================================
// In-memory Sequence Store
// =============================================================================

#[derive(Clone, Default)]
pub struct InMemorySequenceStore {
    state: Arc<Mutex<MemoryState>>,
    /// Number of upcoming `begin` calls that fail with `Contention`.
    contention: Arc<AtomicUsize>,
    begins: Arc<AtomicUsize>,
    counter_locks: Arc<AtomicUsize>,
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the registry at `last_issued`, as if that many numbers had
    /// been minted by some earlier system.
    pub async fn with_last_issued(self, last_issued: i32) -> Self {
        self.state.lock().await.counter.last_issued = last_issued;
        self
    }

    /// Insert a record directly, bypassing the allocator. Also bumps the
    /// registry so the number stays unique.
    pub async fn seed_record(&self, number: i32, status: SequenceStatus) -> SequenceRecord {
        let number = SequenceNumber::new(number).expect("seeded number must be in range");
        let mut record = SequenceRecord::pending(number);
        record.status = status;

        let mut state = self.state.lock().await;
        assert!(
            state.records.values().all(|r| r.number != number),
            "number {} already seeded",
            number
        );
        state.counter.last_issued = state.counter.last_issued.max(number.value());
        state.records.insert(record.id, record.clone());
        record
    }

    /// Make the next `count` transactions abort as if they lost a lock race.
    pub fn fail_next_begins(&self, count: usize) {
        self.contention.store(count, Ordering::SeqCst);
    }

    /// Total `begin` calls, failed ones included.
    pub fn begin_count(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    /// Total `lock_counter` calls across all transactions.
    pub fn counter_lock_count(&self) -> usize {
        self.counter_locks.load(Ordering::SeqCst)
    }

    pub async fn last_issued(&self) -> i32 {
        self.state.lock().await.counter.last_issued
    }
}

#[async_trait]
impl BaseSequenceStore for InMemorySequenceStore {
    async fn begin(&self) -> Result<Box<dyn BaseSequenceTx>, AllocatorError> {
        self.begins.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .contention
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AllocatorError::Contention(
                "could not obtain lock (injected)".into(),
            ));
        }

        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemorySequenceTx {
            guard: Some(guard),
            staged,
            counter_locks: self.counter_locks.clone(),
        }))
    }

    async fn find_record(&self, id: SequenceId) -> Result<Option<SequenceRecord>, AllocatorError> {
        Ok(self.state.lock().await.records.get(&id).cloned())
    }

    async fn list_records(
        &self,
        status: Option<SequenceStatus>,
        limit: i64,
    ) -> Result<Vec<SequenceRecord>, AllocatorError> {
        let state = self.state.lock().await;
        Ok(state
            .sorted_records()
            .into_iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn summary(&self) -> Result<SequenceSummary, AllocatorError> {
        let state = self.state.lock().await;
        Ok(SequenceSummary::from_counts(
            state.counter.last_issued,
            state.records.values().map(|r| (r.status, 1)),
        ))
    }
}

struct InMemorySequenceTx {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    staged: MemoryState,
    counter_locks: Arc<AtomicUsize>,
}

impl InMemorySequenceTx {
    fn ensure_open(&self) -> Result<(), AllocatorError> {
        match self.guard {
            Some(_) => Ok(()),
            None => Err(AllocatorError::Invariant(
                "transaction already committed".into(),
            )),
        }
    }
}

#[async_trait]
impl BaseSequenceTx for InMemorySequenceTx {
    async fn lock_counter(&mut self) -> Result<CounterRegistry, AllocatorError> {
        self.ensure_open()?;
        self.counter_locks.fetch_add(1, Ordering::SeqCst);
        Ok(self.staged.counter.clone())
    }

    async fn save_counter(
        &mut self,
        last_issued: SequenceNumber,
    ) -> Result<CounterRegistry, AllocatorError> {
        self.ensure_open()?;
        let counter = &mut self.staged.counter;
        if counter.last_issued != last_issued.value() - 1 {
            return Err(AllocatorError::Invariant(format!(
                "counter registry is not at {} - 1",
                last_issued
            )));
        }
        counter.last_issued = last_issued.value();
        counter.updated_at = Utc::now();
        Ok(counter.clone())
    }

    async fn lock_oldest_available(&mut self) -> Result<Option<SequenceRecord>, AllocatorError> {
        self.ensure_open()?;
        Ok(self
            .staged
            .records
            .values()
            .filter(|r| r.status == SequenceStatus::Available)
            .min_by_key(|r| r.number)
            .cloned())
    }

    async fn lock_record(
        &mut self,
        id: SequenceId,
    ) -> Result<Option<SequenceRecord>, AllocatorError> {
        self.ensure_open()?;
        Ok(self.staged.records.get(&id).cloned())
    }

    async fn insert_record(
        &mut self,
        record: &SequenceRecord,
    ) -> Result<SequenceRecord, AllocatorError> {
        self.ensure_open()?;
        // Mirrors the UNIQUE constraints on id and number.
        if self.staged.records.contains_key(&record.id)
            || self.staged.records.values().any(|r| r.number == record.number)
        {
            return Err(AllocatorError::Invariant(format!(
                "sequence number {} already has a record",
                record.number
            )));
        }
        self.staged.records.insert(record.id, record.clone());
        Ok(record.clone())
    }

    async fn update_status(
        &mut self,
        id: SequenceId,
        status: SequenceStatus,
    ) -> Result<SequenceRecord, AllocatorError> {
        self.ensure_open()?;
        let record = self
            .staged
            .records
            .get_mut(&id)
            .ok_or(AllocatorError::NotFound(id))?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn commit(&mut self) -> Result<(), AllocatorError> {
        let mut guard = self.guard.take().ok_or_else(|| {
            AllocatorError::Invariant("transaction already committed".into())
        })?;
        *guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}
