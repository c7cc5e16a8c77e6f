//! Cross-module scenarios.


use crate::embeddings::{EmbeddingProvider, MockProvider, ProviderSelection, SelectedProvider};
use crate::index::DocumentIndex;
use std::sync::Arc;

/// In-memory index over a mock embedder.
pub(crate) fn memory_index(dimensions: usize) -> DocumentIndex {
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(MockProvider::new(dimensions));
    DocumentIndex::in_memory(SelectedProvider {
        selection: ProviderSelection {
            provider: provider.provider_name().to_string(),
            model: provider.model_name().to_string(),
            dimensions,
            fallback_used: false,
            primary_error: None,
        },
        provider,
    })
}
