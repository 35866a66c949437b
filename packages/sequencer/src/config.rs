use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::domains::sequences::RetryConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    /// Upper bound on a single row-lock wait before the transaction aborts
    /// and the operation is retried.
    pub lock_timeout_ms: u64,
    pub retry: RetryConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            lock_timeout_ms: env::var("SEQUENCER_LOCK_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("SEQUENCER_LOCK_TIMEOUT_MS must be a valid number")?,
            retry: RetryConfig::from_env()?,
        })
    }
}
