//! PostgreSQL-backed sequence store.
//!
//! Concurrency relies on row locks only: `SELECT ... FOR UPDATE` on the
//! counter row and on individual records. Every transaction sets a
//! `lock_timeout`, so a stuck lock wait aborts with SQLSTATE 55P03 and is
//! retried by the allocator like any other contention failure.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::info;

use super::{BaseSequenceStore, BaseSequenceTx};
use crate::common::SequenceId;
use crate::config::Config;
use crate::domains::sequences::{
    AllocatorError, CounterRegistry, SequenceNumber, SequenceRecord, SequenceStatus,
    SequenceSummary,
};

pub struct PostgresSequenceStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PostgresSequenceStore {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }

    /// Connect using the application configuration.
    pub async fn connect(config: &Config) -> Result<Self> {
        info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("Failed to connect to database")?;
        info!("Database connected");

        Ok(Self::new(pool, config.lock_timeout_ms))
    }

    /// Apply the schema migrations bundled with this crate.
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        info!("Migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BaseSequenceStore for PostgresSequenceStore {
    async fn begin(&self) -> Result<Box<dyn BaseSequenceTx>, AllocatorError> {
        let mut tx = self.pool.begin().await?;

        // SET does not take bind parameters; the value is a plain integer.
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PostgresSequenceTx { tx: Some(tx) }))
    }

    async fn find_record(&self, id: SequenceId) -> Result<Option<SequenceRecord>, AllocatorError> {
        SequenceRecord::find_by_id(id, &self.pool).await
    }

    async fn list_records(
        &self,
        status: Option<SequenceStatus>,
        limit: i64,
    ) -> Result<Vec<SequenceRecord>, AllocatorError> {
        SequenceRecord::find_by_status(status, limit, &self.pool).await
    }

    async fn summary(&self) -> Result<SequenceSummary, AllocatorError> {
        // One snapshot so the counter and the counts agree with each other.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let counter = CounterRegistry::find(&mut *tx).await?;
        let counts = SequenceRecord::count_by_status(&mut *tx).await?;
        tx.commit().await?;

        Ok(SequenceSummary::from_counts(counter.last_issued, counts))
    }
}

struct PostgresSequenceTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresSequenceTx {
    fn conn(&mut self) -> Result<&mut PgConnection, AllocatorError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AllocatorError::Invariant("transaction already committed".into()))
    }
}

#[async_trait]
impl BaseSequenceTx for PostgresSequenceTx {
    async fn lock_counter(&mut self) -> Result<CounterRegistry, AllocatorError> {
        CounterRegistry::lock(self.conn()?).await
    }

    async fn save_counter(
        &mut self,
        last_issued: SequenceNumber,
    ) -> Result<CounterRegistry, AllocatorError> {
        CounterRegistry::store(last_issued, self.conn()?).await
    }

    async fn lock_oldest_available(&mut self) -> Result<Option<SequenceRecord>, AllocatorError> {
        SequenceRecord::lock_oldest_available(self.conn()?).await
    }

    async fn lock_record(
        &mut self,
        id: SequenceId,
    ) -> Result<Option<SequenceRecord>, AllocatorError> {
        SequenceRecord::lock_by_id(id, self.conn()?).await
    }

    async fn insert_record(
        &mut self,
        record: &SequenceRecord,
    ) -> Result<SequenceRecord, AllocatorError> {
        record.insert(self.conn()?).await
    }

    async fn update_status(
        &mut self,
        id: SequenceId,
        status: SequenceStatus,
    ) -> Result<SequenceRecord, AllocatorError> {
        SequenceRecord::update_status(id, status, self.conn()?).await
    }

    async fn commit(&mut self) -> Result<(), AllocatorError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| AllocatorError::Invariant("transaction already committed".into()))?;
        tx.commit().await.map_err(Into::into)
    }
}
