//! Vector index abstraction for stored documents.
//!
//! Defines a trait for backend-agnostic vector storage and retrieval.

use crate::types::IndexedDocument;
use regiguard_core::AppResult;

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Appending version-stamped documents with their embeddings
/// - Nearest-neighbour search returning (document, distance) pairs
/// - Collecting statistics
///
/// Entries are never updated or deleted.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Short backend name for logs and stats.
    fn backend_name(&self) -> &str;

    /// Append documents in one write. Either all are stored or none.
    async fn insert(&self, documents: &[IndexedDocument]) -> AppResult<()>;

    /// Up to `limit` nearest entries, ascending by distance.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> AppResult<Vec<(IndexedDocument, f32)>>;

    /// Number of stored entries.
    async fn count(&self) -> AppResult<usize>;

    /// Number of distinct caller-assigned document ids.
    async fn distinct_ids(&self) -> AppResult<usize>;

    /// Commit any pending changes (for backends that buffer writes).
    async fn flush(&self) -> AppResult<()> {
        Ok(())
    }
}
