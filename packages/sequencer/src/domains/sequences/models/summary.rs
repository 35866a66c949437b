use serde::{Deserialize, Serialize};

use super::SequenceStatus;

/// Operator view: where the registry is and how many records sit in each status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSummary {
    pub last_issued: i32,
    pub pending: i64,
    pub available: i64,
    pub used: i64,
}

impl SequenceSummary {
    pub fn from_counts(
        last_issued: i32,
        counts: impl IntoIterator<Item = (SequenceStatus, i64)>,
    ) -> Self {
        let mut summary = Self {
            last_issued,
            ..Self::default()
        };
        for (status, count) in counts {
            match status {
                SequenceStatus::Pending => summary.pending += count,
                SequenceStatus::Available => summary.available += count,
                SequenceStatus::Used => summary.used += count,
            }
        }
        summary
    }

    /// Every minted number has exactly one record.
    pub fn total(&self) -> i64 {
        self.pending + self.available + self.used
    }
}
