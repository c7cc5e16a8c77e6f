//! Command handlers for the RegiGuard CLI.

pub mod ask;
pub mod ingest;
pub mod seed;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use ingest::IngestCommand;
pub use seed::SeedCommand;
pub use stats::StatsCommand;

use regiguard_core::{AppError, AppResult};
use serde::Serialize;

/// Pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(format!("Failed to serialize output: {}", e)))?;
    println!("{}", output);
    Ok(())
}
