//! Seed command handler.

use super::print_json;
use clap::Args;
use regiguard_core::{config::AppConfig, AppError, AppResult};
use regiguard_knowledge::samples::sample_documents;
use regiguard_knowledge::DocumentIndex;

/// Ingest the sample compliance documents
#[derive(Args, Debug)]
pub struct SeedCommand {
    /// Remove the existing index first
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SeedCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing seed command");

        let index_dir = config.index_dir();
        if self.reset && index_dir.exists() {
            std::fs::remove_dir_all(&index_dir).map_err(|e| {
                AppError::Indexing(format!("Failed to remove index at {:?}: {}", index_dir, e))
            })?;
            tracing::info!("Removed index at {:?}", index_dir);
        }

        let index = DocumentIndex::open(config).await?;
        let stats = index.ingest(&sample_documents()).await?;

        if self.json {
            print_json(&stats)?;
        } else {
            println!("Indexed {} sample documents", stats.documents);
        }

        Ok(())
    }
}
