//! Retry policy for transactions aborted by lock contention.

use anyhow::{Context, Result};
use backon::ExponentialBuilder;
use std::str::FromStr;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Exponential backoff with jitter for `Contention` failures.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RetryConfig {
    /// Retries after the first attempt. Zero disables retrying.
    #[builder(default = 5)]
    pub max_retries: usize,
    #[builder(default = 10)]
    pub initial_delay_ms: u64,
    #[builder(default = 500)]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryConfig {
    /// Reads the policy from the environment. Unset variables take the
    /// default; a value that does not parse is an error.
    ///
    /// - `SEQUENCER_MAX_RETRIES` (default: 5)
    /// - `SEQUENCER_RETRY_INITIAL_MS` (default: 10)
    /// - `SEQUENCER_RETRY_MAX_MS` (default: 500)
    pub fn from_env() -> Result<Self> {
        let default = Self::default();
        Ok(Self {
            max_retries: env_or("SEQUENCER_MAX_RETRIES", default.max_retries)?,
            initial_delay_ms: env_or("SEQUENCER_RETRY_INITIAL_MS", default.initial_delay_ms)?,
            max_delay_ms: env_or("SEQUENCER_RETRY_MAX_MS", default.max_delay_ms)?,
        })
    }

    /// No retries at all; contention surfaces on the first failure.
    pub fn disabled() -> Self {
        Self::builder().max_retries(0).build()
    }

    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}
