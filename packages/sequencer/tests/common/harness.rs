//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container is shared by every test in the binary. Each test
//! gets its own freshly migrated database inside it, so counter state never
//! leaks between tests.

use anyhow::{Context, Result};
use sequencer_core::domains::sequences::{
    RetryConfig, SequenceAllocator, SequenceNumber, SequenceRecord, SequenceStatus,
};
use sequencer_core::kernel::PostgresSequenceStore;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgConnection, PgPool};
use std::sync::Arc;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    /// `host:port` of the running container.
    address: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=sequencer_core=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=300"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let host = postgres.get_host().await?;
        let port = postgres.get_host_port_ipv4(5432).await?;

        Ok(Self {
            address: format!("{}:{}", host, port),
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }

    fn url(&self, database: &str) -> String {
        format!("postgresql://postgres:postgres@{}/{}", self.address, database)
    }
}

/// A migrated, empty database plus an allocator wired to it.
pub struct TestHarness {
    /// Direct pool for fixtures and assertions.
    pub db_pool: PgPool,
    pub store: Arc<PostgresSequenceStore>,
    pub allocator: SequenceAllocator,
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        Self::with_settings(DEFAULT_LOCK_TIMEOUT_MS, fast_retry()).await
    }

    pub async fn with_settings(lock_timeout_ms: u64, retry: RetryConfig) -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let database = format!("test_{}", Uuid::new_v4().simple());
        let mut admin = PgConnection::connect(&infra.url("postgres"))
            .await
            .context("Failed to connect to admin database")?;
        sqlx::query(&format!("CREATE DATABASE \"{}\"", database))
            .execute(&mut admin)
            .await
            .context("Failed to create test database")?;
        admin.close().await?;

        let db_pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(&infra.url(&database))
            .await
            .context("Failed to connect to test database")?;

        let store = Arc::new(PostgresSequenceStore::new(db_pool.clone(), lock_timeout_ms));
        store.migrate().await?;
        let allocator = SequenceAllocator::new(store.clone(), retry);

        Ok(Self {
            db_pool,
            store,
            allocator,
        })
    }

    /// Insert a record behind the allocator's back, keeping the counter at
    /// or above its number.
    pub async fn seed_record(&self, number: i32, status: SequenceStatus) -> Result<SequenceRecord> {
        let mut record = SequenceRecord::pending(SequenceNumber::new(number)?);
        record.status = status;

        let mut tx = self.db_pool.begin().await?;
        let record = record.insert(&mut tx).await?;
        sqlx::query(
            "UPDATE sequence_counters SET last_issued = GREATEST(last_issued, $1) WHERE id = 1",
        )
        .bind(number)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(record)
    }

    pub async fn set_last_issued(&self, last_issued: i32) -> Result<()> {
        sqlx::query("UPDATE sequence_counters SET last_issued = $1 WHERE id = 1")
            .bind(last_issued)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    pub async fn last_issued(&self) -> Result<i32> {
        let value = sqlx::query_scalar("SELECT last_issued FROM sequence_counters WHERE id = 1")
            .fetch_one(&self.db_pool)
            .await?;
        Ok(value)
    }

    pub async fn status_of(&self, number: i32) -> Result<SequenceStatus> {
        let status = sqlx::query_scalar("SELECT status FROM sequence_records WHERE number = $1")
            .bind(number)
            .fetch_one(&self.db_pool)
            .await?;
        Ok(status)
    }
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig::builder()
        .max_retries(5)
        .initial_delay_ms(5)
        .max_delay_ms(50)
        .build()
}
