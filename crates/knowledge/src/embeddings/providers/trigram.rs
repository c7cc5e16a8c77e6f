//! Trigram embedding provider using character trigram-based content-aware embeddings.

use crate::embeddings::provider::EmbeddingProvider;
use regiguard_core::AppResult;
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Trigram-based embedding provider for local, offline operation.
///
/// Generates deterministic embeddings based on text content using
/// character trigrams and word frequencies. Not semantically accurate like
/// neural embedding models, but consistent and content-dependent, which is
/// enough for the offline fallback and the relevance check.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

/// Unit-length trigram embedding of `text`; the zero vector when no word
/// survives stop-word filtering.
pub(crate) fn trigram_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let mut embedding = vec![0.0; dimensions];
    if dimensions == 0 {
        return embedding;
    }

    let lower = text.to_lowercase();
    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

    let mut word_freq: HashMap<&str, u32> = HashMap::new();
    for word in lower
        .unicode_words()
        .filter(|w| !stop_words.contains(w) && w.chars().count() > 2)
    {
        *word_freq.entry(word).or_insert(0) += 1;
    }

    // Map each unique word to several dimensions via its character trigrams
    for (word, freq) in word_freq.iter() {
        let chars: Vec<char> = word.chars().collect();
        for window in chars.windows(3) {
            let trigram_hash = window
                .iter()
                .collect::<String>()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(37).wrapping_add(b as u64));

            let dim_idx = (trigram_hash as usize) % dimensions;
            embedding[dim_idx] += (*freq as f32).sqrt();
        }

        // Also encode whole word
        let word_hash = word
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        embedding[(word_hash as usize) % dimensions] += *freq as f32;
    }

    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut embedding {
            *v /= norm;
        }
    }

    embedding
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| trigram_embedding(text, self.dimensions))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_trigram_provider_embed_batch() {
        let provider = TrigramProvider::new(384);
        let texts = vec![
            "Personal data shall be processed lawfully".to_string(),
            "Form 8 must be filed within 30 days".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 384);
            assert!((norm(embedding) - 1.0).abs() < 0.001);
        }
    }

    #[tokio::test]
    async fn test_trigram_provider_deterministic() {
        let provider = TrigramProvider::new(384);
        let text = "Listed entities must disclose material events";

        let embedding1 = provider.embed(text).await.unwrap();
        let embedding2 = provider.embed(text).await.unwrap();

        assert_eq!(embedding1, embedding2);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let provider = TrigramProvider::new(384);
        let question = provider
            .embed("What does Article 5 say about lawful processing?")
            .await
            .unwrap();
        let related = provider
            .embed("Article 5: personal data shall be processed lawfully, fairly and transparently.")
            .await
            .unwrap();
        let unrelated = provider
            .embed("Form 8 statement of account and solvency due within 30 days.")
            .await
            .unwrap();

        assert!(cosine_similarity(&question, &related) > cosine_similarity(&question, &unrelated));
    }

    #[tokio::test]
    async fn test_trigram_provider_empty_text() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_trigram_provider_utf8_safety() {
        let provider = TrigramProvider::new(384);

        let text = "Datenschutz-Grundverordnung ist verbindlich für Verantwortliche 🇪🇺";
        let embedding = provider.embed(text).await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}
