use thiserror::Error;

use super::models::SequenceStatus;
use crate::common::SequenceId;

/// SQLSTATE codes that mean "another transaction got in the way; try again".
const CONTENTION_CODES: [&str; 3] = [
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available (lock_timeout)
];

/// Errors surfaced by the sequence allocator.
///
/// Only `Contention` is retried internally. Everything else is a final answer
/// for the call that produced it.
#[derive(Error, Debug)]
pub enum AllocatorError {
    /// The numbering space is exhausted. Needs an operator; never retried.
    #[error("Sequence space exhausted: last issued number is {last_issued}")]
    Overflow { last_issued: i32 },

    #[error("Sequence record not found: {0}")]
    NotFound(SequenceId),

    /// The record is not checked out, so it cannot be resolved.
    #[error("Sequence record {id} is not pending (current status: {current})")]
    InvalidState {
        id: SequenceId,
        current: SequenceStatus,
    },

    #[error("Transaction aborted by lock contention: {0}")]
    Contention(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl AllocatorError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AllocatorError::Contention(_))
    }

    /// Current status carried by an `InvalidState` error.
    pub fn current_status(&self) -> Option<SequenceStatus> {
        match self {
            AllocatorError::InvalidState { current, .. } => Some(*current),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AllocatorError {
    fn from(err: sqlx::Error) -> Self {
        let contended = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| CONTENTION_CODES.contains(&&*code))
            .unwrap_or(false);

        if contended {
            AllocatorError::Contention(err.to_string())
        } else {
            AllocatorError::Database(err)
        }
    }
}
