//! Independent grounding check.
//!
//! Scores how close the question is to the retrieved documents with its own
//! local embedder. It never looks at the generated answer.

use crate::embeddings::{cosine_similarity, EmbeddingProvider};
use crate::types::{Reflection, RetrievalResult};
use regiguard_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REFLECT_THRESHOLD: f32 = 0.5;
pub const DEFAULT_REFLECTION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Reflector {
    embedder: Arc<dyn EmbeddingProvider>,
    threshold: f32,
    timeout: Duration,
}

impl Reflector {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            threshold: DEFAULT_REFLECT_THRESHOLD,
            timeout: DEFAULT_REFLECTION_TIMEOUT,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Max cosine similarity between the question and any document, clamped
    /// to [0, 1]. `ok` when it reaches the threshold.
    pub async fn reflect(&self, question: &str, docs: &[RetrievalResult]) -> AppResult<Reflection> {
        if docs.is_empty() {
            return Ok(Reflection {
                relevance: 0.0,
                ok: false,
            });
        }

        let mut texts = Vec::with_capacity(docs.len() + 1);
        texts.push(question.to_string());
        texts.extend(docs.iter().map(|doc| doc.text.clone()));

        let embeddings = tokio::time::timeout(self.timeout, self.embedder.embed_batch(&texts))
            .await
            .map_err(|_| {
                AppError::Reflection(format!(
                    "Relevance check timed out after {}s",
                    self.timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| AppError::Reflection(e.to_string()))?;

        let (question_embedding, doc_embeddings) = embeddings.split_first().ok_or_else(|| {
            AppError::Reflection("Embedder returned no vectors".to_string())
        })?;

        if doc_embeddings.len() != docs.len() {
            return Err(AppError::Reflection(format!(
                "Embedder returned {} document vectors for {} documents",
                doc_embeddings.len(),
                docs.len()
            )));
        }

        let relevance = doc_embeddings
            .iter()
            .map(|doc_embedding| cosine_similarity(question_embedding, doc_embedding))
            .fold(f32::NEG_INFINITY, f32::max)
            .clamp(0.0, 1.0);

        let reflection = Reflection {
            relevance,
            ok: relevance >= self.threshold,
        };

        tracing::debug!(
            relevance = reflection.relevance,
            threshold = self.threshold,
            ok = reflection.ok,
            "Reflection complete"
        );

        Ok(reflection)
    }
}
