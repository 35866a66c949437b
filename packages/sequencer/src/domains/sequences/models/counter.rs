use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use tracing::{debug, error};

use super::SequenceNumber;
use crate::domains::sequences::AllocatorError;
use crate::kernel::BaseSequenceTx;

/// The durable "last issued fresh number".
///
/// A single row. It only moves forward, one step per successful advance, and
/// is only ever written while locked inside the same transaction that creates
/// the record claiming the new number.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterRegistry {
    pub last_issued: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for CounterRegistry {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            last_issued: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl CounterRegistry {
    /// The number an advance would hand out.
    ///
    /// Fails with `Overflow` once `last_issued` has reached the top of the space.
    pub fn next_number(&self) -> Result<SequenceNumber, AllocatorError> {
        if self.last_issued < 0 {
            return Err(AllocatorError::Invariant(format!(
                "counter registry holds a negative value: {}",
                self.last_issued
            )));
        }
        SequenceNumber::after(self.last_issued).ok_or(AllocatorError::Overflow {
            last_issued: self.last_issued,
        })
    }

    /// `AdvanceAndReserve()`: step the registry by one, persist, and return the
    /// reserved number.
    ///
    /// `self` must be the value returned by `tx.lock_counter()`, so the row is
    /// already held by `tx` and the record claiming the number commits (or
    /// rolls back) with it.
    pub async fn advance_and_reserve(
        &self,
        tx: &mut dyn BaseSequenceTx,
    ) -> Result<SequenceNumber, AllocatorError> {
        let next = match self.next_number() {
            Ok(next) => next,
            Err(e) => {
                error!(last_issued = self.last_issued, "sequence space exhausted");
                return Err(e);
            }
        };

        let saved = tx.save_counter(next).await?;
        if saved.last_issued != next.value() {
            return Err(AllocatorError::Invariant(format!(
                "counter registry stored {} after reserving {}",
                saved.last_issued, next
            )));
        }

        debug!(number = %next, "counter registry advanced");
        Ok(next)
    }

    // ========================================================================
    // SQL
    // ========================================================================

    pub async fn find<'e>(executor: impl PgExecutor<'e>) -> Result<Self, AllocatorError> {
        sqlx::query_as::<_, Self>(
            "SELECT last_issued, created_at, updated_at FROM sequence_counters WHERE id = 1",
        )
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AllocatorError::Invariant("counter registry row is missing".into()))
    }

    /// Lock the registry row for the rest of the transaction, creating it on
    /// first use.
    pub async fn lock(conn: &mut PgConnection) -> Result<Self, AllocatorError> {
        sqlx::query(
            r#"
            INSERT INTO sequence_counters (id, last_issued)
            VALUES (1, 0)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .execute(&mut *conn)
        .await?;

        sqlx::query_as::<_, Self>(
            r#"
            SELECT last_issued, created_at, updated_at
            FROM sequence_counters
            WHERE id = 1
            FOR UPDATE
            "#,
        )
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
    }

    /// Persist a new `last_issued`. The `WHERE` clause refuses to move the
    /// counter backwards or skip ahead.
    pub async fn store(
        last_issued: SequenceNumber,
        conn: &mut PgConnection,
    ) -> Result<Self, AllocatorError> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE sequence_counters
            SET last_issued = $1,
                updated_at = $2
            WHERE id = 1 AND last_issued = $1 - 1
            RETURNING last_issued, created_at, updated_at
            "#,
        )
        .bind(last_issued.value())
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            AllocatorError::Invariant(format!(
                "counter registry is not at {} - 1",
                last_issued
            ))
        })
    }
}
