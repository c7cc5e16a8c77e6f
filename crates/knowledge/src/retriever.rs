//! Role-scoped retrieval over the document index.

use crate::index::DocumentIndex;
use crate::types::{RetrievalResult, Role};
use regiguard_core::AppResult;
use std::sync::Arc;

pub const DEFAULT_OVERSAMPLE: usize = 2;

/// Over-fetches from the index, drops what the role may not see, and keeps
/// the `k` closest.
#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<DocumentIndex>,
    oversample: usize,
}

impl Retriever {
    pub fn new(index: Arc<DocumentIndex>) -> Self {
        Self {
            index,
            oversample: DEFAULT_OVERSAMPLE,
        }
    }

    pub fn with_oversample(mut self, oversample: usize) -> Self {
        self.oversample = oversample.max(1);
        self
    }

    pub fn index(&self) -> &Arc<DocumentIndex> {
        &self.index
    }

    /// At most `k` documents the role may read, ascending by distance.
    /// Fewer than `k` is not an error.
    pub async fn retrieve(
        &self,
        question: &str,
        role: Role,
        k: usize,
    ) -> AppResult<Vec<RetrievalResult>> {
        let fetch = k.saturating_mul(self.oversample);
        let candidates = self.index.query(question, fetch).await?;
        let fetched = candidates.len();

        let mut docs: Vec<RetrievalResult> = candidates
            .into_iter()
            .filter(|doc| role.permits(doc.access))
            .collect();

        docs.sort_by(|a, b| a.score.total_cmp(&b.score));
        docs.truncate(k);

        if docs.len() < k {
            tracing::debug!(
                role = %role,
                requested = k,
                fetched,
                returned = docs.len(),
                "Retrieval shortfall after access filtering"
            );
        }

        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingProvider, MockProvider, ProviderSelection, SelectedProvider};
    use crate::types::{AccessLevel, DocumentRecord};

    async fn seeded_retriever() -> Retriever {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(MockProvider::new(128));
        let index = DocumentIndex::in_memory(SelectedProvider {
            selection: ProviderSelection {
                provider: "mock".to_string(),
                model: "trigram-v1".to_string(),
                dimensions: 128,
                fallback_used: false,
                primary_error: None,
            },
            provider,
        });

        index
            .ingest(&[
                DocumentRecord::new("internal_a", "filing penalty schedule", AccessLevel::Internal),
                DocumentRecord::new("internal_b", "filing penalty appeals", AccessLevel::Internal),
                DocumentRecord::new("public_a", "filing penalty overview", AccessLevel::Public),
            ])
            .await
            .unwrap();

        Retriever::new(Arc::new(index))
    }

    #[tokio::test]
    async fn test_analyst_sees_only_public() {
        let retriever = seeded_retriever().await.with_oversample(3);
        let docs = retriever
            .retrieve("filing penalty", Role::Analyst, 3)
            .await
            .unwrap();

        assert!(!docs.is_empty());
        assert!(docs.iter().all(|d| d.access == AccessLevel::Public));
    }

    #[tokio::test]
    async fn test_officer_sees_internal() {
        let retriever = seeded_retriever().await;
        let docs = retriever
            .retrieve("filing penalty", Role::Officer, 3)
            .await
            .unwrap();

        assert_eq!(docs.len(), 3);
        assert!(docs.iter().any(|d| d.access == AccessLevel::Internal));
        assert!(docs.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[tokio::test]
    async fn test_shortfall_is_not_an_error() {
        let retriever = seeded_retriever().await;
        let docs = retriever
            .retrieve("filing penalty", Role::Analyst, 5)
            .await
            .unwrap();

        assert!(docs.len() <= 1);
    }
}
