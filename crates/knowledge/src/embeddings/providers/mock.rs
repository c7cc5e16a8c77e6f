//! Mock embedding provider: trigram embeddings plus call accounting.

use super::trigram::trigram_embedding;
use crate::embeddings::provider::EmbeddingProvider;
use regiguard_core::{AppError, AppResult};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock provider for tests.
///
/// Produces the same vectors as the trigram provider and counts every
/// `embed_batch` invocation, so tests can assert that no model was called.
/// A failing instance returns an embedding error on every call.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
    calls: AtomicUsize,
    texts: AtomicUsize,
    failure: Option<String>,
}

impl MockProvider {
    /// Create a new mock provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
            failure: None,
        }
    }

    /// A provider whose every call fails with `message`.
    pub fn failing(dimensions: usize, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(dimensions)
        }
    }

    /// Number of `embed_batch` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of texts embedded so far.
    pub fn texts_embedded(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(ref message) = self.failure {
            return Err(AppError::Embedding(message.clone()));
        }

        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| trigram_embedding(text, self.dimensions))
            .collect())
    }
}
