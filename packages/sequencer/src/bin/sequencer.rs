//! Operator CLI for the sequence allocator
//!
//! Every command prints one JSON object on stdout. Domain errors (unknown id,
//! record not pending, exhausted space) are reported as `success: false` with
//! exit code 2; infrastructure failures bubble up as a non-zero exit.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sequencer_core::common::SequenceId;
use sequencer_core::config::Config;
use sequencer_core::domains::sequences::{
    AllocatorError, Outcome, SequenceAllocator, SequenceStatus,
};
use sequencer_core::kernel::PostgresSequenceStore;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sequencer")]
#[command(about = "Allocate and resolve gapless document sequence numbers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,

    /// Check out the next sequence number
    Allocate,

    /// Report the outcome for a pending number
    Resolve {
        id: SequenceId,
        /// consumed | reclaim
        outcome: Outcome,
    },

    /// Show a single record
    Show { id: SequenceId },

    /// List records in ascending number order
    List {
        /// pending | available | used
        #[arg(long)]
        status: Option<SequenceStatus>,
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },

    /// Counter value and record counts per status
    Summary,
}

// ============================================================================
// JSON Response Types
// ============================================================================

#[derive(Serialize)]
struct Response<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_status: Option<SequenceStatus>,
}

fn output<T: Serialize>(message: Option<&str>, data: T) -> Result<ExitCode> {
    let resp = Response {
        success: true,
        message: message.map(str::to_string),
        data: Some(data),
    };
    println!("{}", serde_json::to_string(&resp)?);
    Ok(ExitCode::SUCCESS)
}

/// Domain errors become a JSON answer; anything else is a real failure.
fn output_error(err: AllocatorError) -> Result<ExitCode> {
    match err {
        AllocatorError::Database(_) | AllocatorError::Invariant(_) => Err(err.into()),
        err => {
            let resp = ErrorResponse {
                success: false,
                error: err.to_string(),
                current_status: err.current_status(),
            };
            println!("{}", serde_json::to_string(&resp)?);
            Ok(ExitCode::from(2))
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sequencer_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    let store = Arc::new(PostgresSequenceStore::connect(&config).await?);
    let allocator = SequenceAllocator::new(store.clone(), config.retry.clone());

    match cli.command {
        Commands::Migrate => {
            store.migrate().await?;
            output(Some("Migrations complete"), ())
        }
        Commands::Allocate => match allocator.allocate().await {
            Ok(allocation) if allocation.reused => {
                output(Some("Reused previously reclaimed number"), allocation)
            }
            Ok(allocation) => output(Some("New sequence number issued"), allocation),
            Err(e) => output_error(e),
        },
        Commands::Resolve { id, outcome } => match allocator.resolve(id, outcome).await {
            Ok(record) => output(Some("Status updated"), record),
            Err(e) => output_error(e),
        },
        Commands::Show { id } => match allocator.find(id).await {
            Ok(record) => output(None, record),
            Err(e) => output_error(e),
        },
        Commands::List { status, limit } => match allocator.list(status, limit).await {
            Ok(records) => output(None, records),
            Err(e) => output_error(e),
        },
        Commands::Summary => match allocator.summary().await {
            Ok(summary) => output(None, summary),
            Err(e) => output_error(e),
        },
    }
}
