use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Enums
// ============================================================================

/// Lifecycle of a sequence record.
///
/// ```text
///   (created) ──► Pending ──Resolve(Consumed)──► Used   (terminal)
///                  │   ▲
///  Resolve(Reclaim)│   │Allocate (reuse)
///                  ▼   │
///                 Available
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "sequence_status", rename_all = "snake_case")]
pub enum SequenceStatus {
    /// Handed to a caller, outcome not reported yet.
    #[default]
    Pending,
    /// Reclaimed; next in line for reuse.
    Available,
    /// Consumed by an authorized document. Never changes again.
    Used,
}

/// What the caller learned about a pending number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The document was authorized; the number is spent.
    Consumed,
    /// The attempt failed; the number goes back to the pool.
    Reclaim,
}

impl SequenceStatus {
    pub const ALL: [SequenceStatus; 3] = [
        SequenceStatus::Pending,
        SequenceStatus::Available,
        SequenceStatus::Used,
    ];

    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceStatus::Pending => "pending",
            SequenceStatus::Available => "available",
            SequenceStatus::Used => "used",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SequenceStatus::Used)
    }

    /// The single place where status transitions are validated.
    ///
    /// Allowed: `Pending → Available`, `Pending → Used`, `Available → Pending`.
    /// Everything else, including any move out of `Used`, returns the current
    /// status as the error.
    pub fn transition(self, to: SequenceStatus) -> Result<SequenceStatus, SequenceStatus> {
        use SequenceStatus::*;

        match (self, to) {
            (Pending, Available) | (Pending, Used) | (Available, Pending) => Ok(to),
            _ => Err(self),
        }
    }
}

impl fmt::Display for SequenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceStatus::Pending => write!(f, "Pending"),
            SequenceStatus::Available => write!(f, "Available"),
            SequenceStatus::Used => write!(f, "Used"),
        }
    }
}

impl FromStr for SequenceStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(SequenceStatus::Pending),
            "available" => Ok(SequenceStatus::Available),
            "used" => Ok(SequenceStatus::Used),
            _ => Err(anyhow::anyhow!("Invalid sequence status: {}", s)),
        }
    }
}

impl Outcome {
    /// Status a pending record moves to for this outcome.
    pub fn target(&self) -> SequenceStatus {
        match self {
            Outcome::Consumed => SequenceStatus::Used,
            Outcome::Reclaim => SequenceStatus::Available,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Consumed => write!(f, "consumed"),
            Outcome::Reclaim => write!(f, "reclaim"),
        }
    }
}

/// Also accepts the target status names (`used`, `available`), which is what
/// older integrations send.
impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "consumed" | "used" => Ok(Outcome::Consumed),
            "reclaim" | "available" => Ok(Outcome::Reclaim),
            _ => Err(anyhow::anyhow!(
                "Invalid outcome: {} (expected consumed or reclaim)",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SequenceStatus::*;

    #[test]
    fn pending_can_be_consumed_or_reclaimed() {
        assert_eq!(Pending.transition(Used), Ok(Used));
        assert_eq!(Pending.transition(Available), Ok(Available));
    }

    #[test]
    fn available_only_goes_back_to_pending() {
        assert_eq!(Available.transition(Pending), Ok(Pending));
        assert_eq!(Available.transition(Used), Err(Available));
        assert_eq!(Available.transition(Available), Err(Available));
    }

    #[test]
    fn used_is_terminal() {
        for to in SequenceStatus::ALL {
            assert_eq!(Used.transition(to), Err(Used));
        }
        assert!(Used.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn pending_to_pending_is_rejected() {
        assert_eq!(Pending.transition(Pending), Err(Pending));
    }

    #[test]
    fn outcome_targets() {
        assert_eq!(Outcome::Consumed.target(), Used);
        assert_eq!(Outcome::Reclaim.target(), Available);
    }

    #[test]
    fn outcome_parses_both_vocabularies() {
        assert_eq!("consumed".parse::<Outcome>().unwrap(), Outcome::Consumed);
        assert_eq!("USED".parse::<Outcome>().unwrap(), Outcome::Consumed);
        assert_eq!("reclaim".parse::<Outcome>().unwrap(), Outcome::Reclaim);
        assert_eq!("available".parse::<Outcome>().unwrap(), Outcome::Reclaim);
        assert!("pending".parse::<Outcome>().is_err());
    }

    #[test]
    fn status_display_and_parse() {
        assert_eq!(Used.to_string(), "Used");
        assert_eq!(Available.as_str(), "available");
        assert_eq!("Pending".parse::<SequenceStatus>().unwrap(), Pending);
        assert!("expired".parse::<SequenceStatus>().is_err());
    }

    #[test]
    fn serde_uses_variant_names() {
        assert_eq!(serde_json::to_string(&Pending).unwrap(), "\"Pending\"");
        assert_eq!(
            serde_json::to_string(&Outcome::Reclaim).unwrap(),
            "\"reclaim\""
        );
    }
}
