//! In-process vector index.

use crate::embeddings::squared_l2;
use crate::types::IndexedDocument;
use crate::vector_index::VectorIndex;
use regiguard_core::{AppError, AppResult};
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Exhaustive-scan index held in memory. Scores are squared L2 distances.
#[derive(Debug)]
pub struct MemoryIndex {
    dimensions: usize,
    documents: RwLock<Vec<IndexedDocument>>,
}

impl MemoryIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            documents: RwLock::new(Vec::new()),
        }
    }

    fn check_dimensions(&self, embedding: &[f32], what: &str) -> AppResult<()> {
        if embedding.len() != self.dimensions {
            return Err(AppError::Indexing(format!(
                "{} dimension mismatch: expected {}, got {}",
                what,
                self.dimensions,
                embedding.len()
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl VectorIndex for MemoryIndex {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, documents: &[IndexedDocument]) -> AppResult<()> {
        for doc in documents {
            self.check_dimensions(&doc.embedding, "Embedding")?;
        }

        let mut stored = self.documents.write().await;
        stored.extend_from_slice(documents);

        tracing::debug!("Inserted {} entries into memory index", documents.len());
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> AppResult<Vec<(IndexedDocument, f32)>> {
        if query_embedding.len() != self.dimensions {
            return Err(AppError::Retrieval(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                query_embedding.len()
            )));
        }

        let stored = self.documents.read().await;

        let mut scored: Vec<(IndexedDocument, f32)> = stored
            .iter()
            .map(|doc| (doc.clone(), squared_l2(query_embedding, &doc.embedding)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(limit);

        Ok(scored)
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.documents.read().await.len())
    }

    async fn distinct_ids(&self) -> AppResult<usize> {
        let stored = self.documents.read().await;
        Ok(stored
            .iter()
            .map(|doc| doc.id.as_str())
            .collect::<HashSet<_>>()
            .len())
    }
}
