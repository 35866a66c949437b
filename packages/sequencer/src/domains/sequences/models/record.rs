use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};

use super::{SequenceNumber, SequenceStatus};
use crate::common::SequenceId;
use crate::domains::sequences::AllocatorError;

/// One issued number and where it is in its lifecycle.
///
/// Created exactly once, on first issuance. Reuse moves the same row back to
/// `Pending`; rows are never deleted.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub id: SequenceId,
    pub number: SequenceNumber,
    pub status: SequenceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of `Allocate()`: the checked-out record and whether it was recycled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    #[serde(flatten)]
    pub record: SequenceRecord,
    pub reused: bool,
}

impl Allocation {
    pub fn fresh(record: SequenceRecord) -> Self {
        Self {
            record,
            reused: false,
        }
    }

    pub fn reused(record: SequenceRecord) -> Self {
        Self {
            record,
            reused: true,
        }
    }

    pub fn id(&self) -> SequenceId {
        self.record.id
    }

    pub fn number(&self) -> SequenceNumber {
        self.record.number
    }
}

impl SequenceRecord {
    /// A freshly minted record, checked out to the caller.
    pub fn pending(number: SequenceNumber) -> Self {
        let now = Utc::now();
        Self {
            id: SequenceId::new(),
            number,
            status: SequenceStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn formatted_number(&self) -> String {
        self.number.formatted()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn find_by_id<'e>(
        id: SequenceId,
        executor: impl PgExecutor<'e>,
    ) -> Result<Option<Self>, AllocatorError> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, number, status, created_at, updated_at
            FROM sequence_records
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(Into::into)
    }

    /// Records ordered by number, optionally restricted to one status.
    pub async fn find_by_status<'e>(
        status: Option<SequenceStatus>,
        limit: i64,
        executor: impl PgExecutor<'e>,
    ) -> Result<Vec<Self>, AllocatorError> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, number, status, created_at, updated_at
            FROM sequence_records
            WHERE ($1::sequence_status IS NULL OR status = $1)
            ORDER BY number
            LIMIT $2
            "#,
        )
        .bind(status)
        .bind(limit)
        .fetch_all(executor)
        .await
        .map_err(Into::into)
    }

    pub async fn count_by_status<'e>(
        executor: impl PgExecutor<'e>,
    ) -> Result<Vec<(SequenceStatus, i64)>, AllocatorError> {
        sqlx::query_as::<_, (SequenceStatus, i64)>(
            "SELECT status, COUNT(*) FROM sequence_records GROUP BY status",
        )
        .fetch_all(executor)
        .await
        .map_err(Into::into)
    }

    // ========================================================================
    // Locking reads and writes (inside a transaction)
    // ========================================================================

    /// Lowest-numbered available record, locked for the rest of the transaction.
    pub async fn lock_oldest_available(
        conn: &mut PgConnection,
    ) -> Result<Option<Self>, AllocatorError> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, number, status, created_at, updated_at
            FROM sequence_records
            WHERE status = 'available'
            ORDER BY number
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .fetch_optional(&mut *conn)
        .await
        .map_err(Into::into)
    }

    pub async fn lock_by_id(
        id: SequenceId,
        conn: &mut PgConnection,
    ) -> Result<Option<Self>, AllocatorError> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT id, number, status, created_at, updated_at
            FROM sequence_records
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Into::into)
    }

    pub async fn insert(&self, conn: &mut PgConnection) -> Result<Self, AllocatorError> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO sequence_records (id, number, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, number, status, created_at, updated_at
            "#,
        )
        .bind(self.id)
        .bind(self.number)
        .bind(self.status)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }

    pub async fn update_status(
        id: SequenceId,
        status: SequenceStatus,
        conn: &mut PgConnection,
    ) -> Result<Self, AllocatorError> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE sequence_records
            SET status = $2,
                updated_at = $3
            WHERE id = $1
            RETURNING id, number, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AllocatorError::NotFound(id))
    }
}
