//! Stats command handler.
//!
//! Shows index size and the embedder it was built with.

use super::print_json;
use clap::Args;
use regiguard_core::{config::AppConfig, AppResult};
use regiguard_knowledge::embeddings::IndexManifest;
use regiguard_knowledge::DocumentIndex;

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        if !IndexManifest::path(&config.index_dir()).exists() {
            println!("No index yet. Run `regiguard seed` or `regiguard ingest --file <json>`.");
            return Ok(());
        }

        let index = DocumentIndex::open(config).await?;
        let stats = index.stats().await?;

        if self.json {
            print_json(&stats)?;
            return Ok(());
        }

        println!("Entries:      {}", stats.entries);
        println!("Document ids: {}", stats.distinct_ids);
        println!(
            "Embedder:     {} / {} ({} dims){}",
            stats.provider,
            stats.model,
            stats.dimensions,
            if stats.fallback_used { ", fallback" } else { "" }
        );

        Ok(())
    }
}
