//! LanceDB-backed vector index implementation.

use crate::types::{AccessLevel, IndexedDocument, Metadata};
use crate::vector_index::VectorIndex;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::Table;
use regiguard_core::{AppError, AppResult};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Table holding every ingested entry.
pub const DOCUMENTS_TABLE: &str = "documents";

/// Column LanceDB adds to vector search results.
const DISTANCE_COLUMN: &str = "_distance";

/// LanceDB-backed vector index. Scores are LanceDB's L2 `_distance`.
pub struct LanceDbIndex {
    table: Table,
    embedding_dim: usize,
}

impl std::fmt::Debug for LanceDbIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanceDbIndex")
            .field("table", &self.table.name())
            .field("embedding_dim", &self.embedding_dim)
            .finish()
    }
}

impl LanceDbIndex {
    /// Create or open the documents table under `db_path`.
    ///
    /// # Arguments
    /// * `db_path` - Directory path for the LanceDB database
    /// * `embedding_dim` - Dimension of embedding vectors (e.g., 384)
    pub async fn open(db_path: &Path, embedding_dim: usize) -> AppResult<Self> {
        std::fs::create_dir_all(db_path).map_err(|e| {
            AppError::Indexing(format!("Failed to create index directory: {}", e))
        })?;

        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Indexing(format!("Failed to connect to LanceDB: {}", e)))?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Indexing(format!("Failed to list tables: {}", e)))?;

        let table = if table_names.iter().any(|name| name == DOCUMENTS_TABLE) {
            conn.open_table(DOCUMENTS_TABLE)
                .execute()
                .await
                .map_err(|e| AppError::Indexing(format!("Failed to open table: {}", e)))?
        } else {
            let schema = Self::create_schema(embedding_dim);
            let empty_batch = RecordBatch::new_empty(schema.clone());

            conn.create_table(
                DOCUMENTS_TABLE,
                RecordBatchIterator::new(vec![Ok(empty_batch)], schema),
            )
            .execute()
            .await
            .map_err(|e| AppError::Indexing(format!("Failed to create table: {}", e)))?
        };

        tracing::debug!("Initialized LanceDB index at {:?}", db_path);

        Ok(Self {
            table,
            embedding_dim,
        })
    }

    fn create_schema(embedding_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("row_id", DataType::Utf8, false),
            Field::new("id", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("access", DataType::Utf8, false),
            Field::new("version", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    embedding_dim as i32,
                ),
                false,
            ),
            // Merged metadata as JSON
            Field::new("metadata", DataType::Utf8, false),
        ]))
    }

    /// Convert documents to a single Arrow RecordBatch.
    fn documents_to_batch(&self, documents: &[IndexedDocument]) -> AppResult<RecordBatch> {
        let schema = Self::create_schema(self.embedding_dim);

        let mut flat = Vec::with_capacity(documents.len() * self.embedding_dim);
        let mut metadata_json = Vec::with_capacity(documents.len());

        for doc in documents {
            if doc.embedding.len() != self.embedding_dim {
                return Err(AppError::Indexing(format!(
                    "Embedding dimension mismatch for '{}': expected {}, got {}",
                    doc.id,
                    self.embedding_dim,
                    doc.embedding.len()
                )));
            }
            flat.extend_from_slice(&doc.embedding);
            metadata_json.push(serde_json::to_string(&doc.metadata).map_err(|e| {
                AppError::Indexing(format!("Failed to serialize metadata for '{}': {}", doc.id, e))
            })?);
        }

        let embedding_array = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.embedding_dim as i32,
            Arc::new(Float32Array::from(flat)),
            None,
        )
        .map_err(|e| AppError::Indexing(format!("Failed to build embedding column: {}", e)))?;

        let strings = |f: fn(&IndexedDocument) -> &str| {
            StringArray::from(documents.iter().map(f).collect::<Vec<_>>())
        };

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(strings(|d| d.row_id.as_str())),
                Arc::new(strings(|d| d.id.as_str())),
                Arc::new(strings(|d| d.text.as_str())),
                Arc::new(strings(|d| d.access.as_str())),
                Arc::new(strings(|d| d.version.as_str())),
                Arc::new(embedding_array),
                Arc::new(StringArray::from(metadata_json)),
            ],
        )
        .map_err(|e| AppError::Indexing(format!("Failed to create RecordBatch: {}", e)))
    }

    /// Convert one result row back to a document and its distance.
    fn row_to_document(batch: &RecordBatch, row_idx: usize) -> AppResult<(IndexedDocument, f32)> {
        let string_at = |name: &str| -> AppResult<String> {
            batch
                .column_by_name(name)
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .map(|c| c.value(row_idx).to_string())
                .ok_or_else(|| AppError::Retrieval(format!("Invalid {} column", name)))
        };

        let embedding_list = batch
            .column_by_name("embedding")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| AppError::Retrieval("Invalid embedding column".to_string()))?;

        let embedding_ref = embedding_list.value(row_idx);
        let embedding_values = embedding_ref
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| AppError::Retrieval("Invalid embedding values".to_string()))?;

        let distance = batch
            .column_by_name(DISTANCE_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
            .map(|c| c.value(row_idx))
            .ok_or_else(|| AppError::Retrieval("Missing _distance column".to_string()))?;

        let access: AccessLevel = string_at("access")?
            .parse()
            .map_err(|e| AppError::Retrieval(format!("Stored entry has bad access: {}", e)))?;

        let metadata: Metadata = serde_json::from_str(&string_at("metadata")?)
            .map_err(|e| AppError::Retrieval(format!("Failed to parse metadata: {}", e)))?;

        let document = IndexedDocument {
            row_id: string_at("row_id")?,
            id: string_at("id")?,
            text: string_at("text")?,
            access,
            version: string_at("version")?,
            metadata,
            embedding: embedding_values.values().to_vec(),
        };

        Ok((document, distance))
    }
}

#[async_trait::async_trait]
impl VectorIndex for LanceDbIndex {
    fn backend_name(&self) -> &str {
        "lancedb"
    }

    async fn insert(&self, documents: &[IndexedDocument]) -> AppResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let batch = self.documents_to_batch(documents)?;
        let schema = batch.schema();

        self.table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .map_err(|e| AppError::Indexing(format!("Failed to add documents: {}", e)))?;

        tracing::debug!("Batch inserted {} entries into LanceDB", documents.len());
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> AppResult<Vec<(IndexedDocument, f32)>> {
        if query_embedding.len() != self.embedding_dim {
            return Err(AppError::Retrieval(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.embedding_dim,
                query_embedding.len()
            )));
        }

        if limit == 0 {
            return Ok(Vec::new());
        }

        let batches = self
            .table
            .query()
            .nearest_to(query_embedding.to_vec())
            .map_err(|e| AppError::Retrieval(format!("Failed to create query: {}", e)))?
            .limit(limit)
            .execute()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to execute search: {}", e)))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to collect results: {}", e)))?;

        let mut results = Vec::new();
        for batch in &batches {
            for row_idx in 0..batch.num_rows() {
                results.push(Self::row_to_document(batch, row_idx)?);
            }
        }

        results.sort_by(|a, b| a.1.total_cmp(&b.1));

        tracing::debug!(
            "Retrieved {} entries (requested {})",
            results.len(),
            limit
        );

        Ok(results)
    }

    async fn count(&self) -> AppResult<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to count rows: {}", e)))
    }

    async fn distinct_ids(&self) -> AppResult<usize> {
        let batches = self
            .table
            .query()
            .select(Select::columns(&["id"]))
            .execute()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to scan ids: {}", e)))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to collect ids: {}", e)))?;

        let mut ids = HashSet::new();
        for batch in &batches {
            let column = batch
                .column_by_name("id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| AppError::Retrieval("Invalid id column".to_string()))?;
            for row_idx in 0..column.len() {
                ids.insert(column.value(row_idx).to_string());
            }
        }

        Ok(ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(id: &str, access: AccessLevel, embedding: Vec<f32>) -> IndexedDocument {
        let mut metadata = Metadata::new();
        metadata.insert("id".to_string(), id.into());
        metadata.insert("access".to_string(), access.as_str().into());
        IndexedDocument {
            row_id: uuid::Uuid::new_v4().to_string(),
            id: id.to_string(),
            text: format!("text of {}", id),
            access,
            version: "2026-01-01T00:00:00.000000Z".to_string(),
            metadata,
            embedding,
        }
    }

    #[tokio::test]
    async fn test_insert_and_search_round_trips_columns() {
        let temp = TempDir::new().unwrap();
        let index = LanceDbIndex::open(temp.path(), 3).await.unwrap();

        index
            .insert(&[
                doc("near", AccessLevel::Internal, vec![1.0, 0.0, 0.0]),
                doc("far", AccessLevel::Public, vec![0.0, 0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, "near");
        assert_eq!(results[0].0.access, AccessLevel::Internal);
        assert_eq!(results[0].0.metadata["id"], "near");
        assert!(results[0].1 <= results[1].1);
    }

    #[tokio::test]
    async fn test_reopen_keeps_entries() {
        let temp = TempDir::new().unwrap();
        {
            let index = LanceDbIndex::open(temp.path(), 2).await.unwrap();
            index
                .insert(&[
                    doc("a", AccessLevel::Public, vec![1.0, 0.0]),
                    doc("a", AccessLevel::Public, vec![0.0, 1.0]),
                ])
                .await
                .unwrap();
        }

        let index = LanceDbIndex::open(temp.path(), 2).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
        assert_eq!(index.distinct_ids().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let temp = TempDir::new().unwrap();
        let index = LanceDbIndex::open(temp.path(), 3).await.unwrap();

        let err = index
            .insert(&[doc("a", AccessLevel::Public, vec![1.0])])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "indexing");

        let err = index.search(&[1.0], 1).await.unwrap_err();
        assert_eq!(err.kind(), "retrieval");
    }
}
