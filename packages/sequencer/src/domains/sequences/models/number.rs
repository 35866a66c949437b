//! Fixed-width sequence numbers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A number in `[1, 999_999_999]`.
///
/// Persisted as a plain integer; callers always see the zero-padded nine digit
/// form (`000000042`). Serde uses the padded form as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct SequenceNumber(i32);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseSequenceNumberError {
    #[error("sequence number must be digits only: {0:?}")]
    NotNumeric(String),

    #[error("sequence number {0} is outside 1..=999999999")]
    OutOfRange(i64),
}

impl SequenceNumber {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 999_999_999;
    /// Digits in the caller-visible form.
    pub const WIDTH: usize = 9;

    pub fn new(value: i32) -> Result<Self, ParseSequenceNumberError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ParseSequenceNumberError::OutOfRange(value as i64))
        }
    }

    /// The number that follows `last_issued`, or `None` once the space is exhausted.
    pub fn after(last_issued: i32) -> Option<Self> {
        let next = last_issued.checked_add(1)?;
        Self::new(next).ok()
    }

    pub fn value(self) -> i32 {
        self.0
    }

    /// Zero-padded nine digit representation.
    pub fn formatted(self) -> String {
        format!("{:0width$}", self.0, width = Self::WIDTH)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = Self::WIDTH)
    }
}

/// Accepts both the padded form and a bare integer (`"000000042"`, `"42"`).
impl FromStr for SequenceNumber {
    type Err = ParseSequenceNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseSequenceNumberError::NotNumeric(s.to_string()));
        }
        let value: i64 = trimmed
            .parse()
            .map_err(|_| ParseSequenceNumberError::NotNumeric(s.to_string()))?;
        if value < Self::MIN as i64 || value > Self::MAX as i64 {
            return Err(ParseSequenceNumberError::OutOfRange(value));
        }
        Ok(Self(value as i32))
    }
}

impl TryFrom<i32> for SequenceNumber {
    type Error = ParseSequenceNumberError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for SequenceNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.formatted())
    }
}

impl<'de> Deserialize<'de> for SequenceNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
