//! Ingest command handler.
//!
//! Reads a JSON array of documents and adds it to the workspace index as one
//! batch.

use super::print_json;
use clap::Args;
use regiguard_core::{config::AppConfig, AppError, AppResult};
use regiguard_knowledge::{DocumentIndex, DocumentRecord};
use std::path::{Path, PathBuf};

/// Ingest a batch of documents from a JSON file
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// JSON array of {id, text, access, metadata}
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");

        let records = read_records(&self.file)?;
        let index = DocumentIndex::open(config).await?;
        let stats = index.ingest(&records).await?;

        if self.json {
            print_json(&stats)?;
        } else {
            println!(
                "Ingested {} documents in {:.2}s",
                stats.documents, stats.duration_secs
            );
        }

        Ok(())
    }
}

pub(crate) fn read_records(path: &Path) -> AppResult<Vec<DocumentRecord>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Validation(format!("Failed to read ingest file {:?}: {}", path, e))
    })?;

    serde_json::from_str(&contents).map_err(|e| {
        AppError::Validation(format!("Invalid ingest file {:?}: {}", path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use regiguard_knowledge::AccessLevel;
    use tempfile::TempDir;

    #[test]
    fn test_read_records() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("docs.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "a", "text": "alpha", "access": "internal"},
                {"id": "b", "text": "beta", "meta": {"region": "EU"}}
            ]"#,
        )
        .unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].access, AccessLevel::Internal);
        assert_eq!(records[1].access, AccessLevel::Public);
        assert_eq!(records[1].metadata["region"], "EU");
    }

    #[test]
    fn test_read_records_rejects_bad_access() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("docs.json");
        std::fs::write(&path, r#"[{"id": "a", "text": "alpha", "access": "secret"}]"#).unwrap();

        let err = read_records(&path).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
