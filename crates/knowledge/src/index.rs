//! Document index: ingestion, similarity query and statistics over a
//! `VectorIndex` backend and the selected embedding provider.

use crate::embeddings::{
    select_provider, select_recorded, EmbeddingProvider, IndexManifest, ProviderSelection,
    SelectedProvider,
};
use crate::lancedb_index::LanceDbIndex;
use crate::memory_index::MemoryIndex;
use crate::types::{
    AccessLevel, DocumentRecord, IndexStats, IndexedDocument, IngestStats, Metadata,
    RetrievalResult, META_ACCESS, META_ID, META_VERSION,
};
use crate::vector_index::VectorIndex;
use chrono::{SecondsFormat, Utc};
use regiguard_core::{AppConfig, AppError, AppResult};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

const DEFAULT_EMBED_BATCH: usize = 100;

/// Embedded document store shared by ingestion and retrieval.
#[derive(Clone)]
pub struct DocumentIndex {
    store: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    selection: ProviderSelection,
    embed_batch_size: usize,
}

impl std::fmt::Debug for DocumentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndex")
            .field("store", &self.store.backend_name())
            .field("selection", &self.selection)
            .finish()
    }
}

/// A record after stamping and merging, before embedding.
struct PreparedRecord {
    id: String,
    text: String,
    access: AccessLevel,
    version: String,
    metadata: Metadata,
}

impl DocumentIndex {
    pub fn new(store: Arc<dyn VectorIndex>, selected: SelectedProvider) -> Self {
        Self {
            store,
            embedder: selected.provider,
            selection: selected.selection,
            embed_batch_size: DEFAULT_EMBED_BATCH,
        }
    }

    /// In-process index sized for the selected provider.
    pub fn in_memory(selected: SelectedProvider) -> Self {
        let store = Arc::new(MemoryIndex::new(selected.selection.dimensions));
        Self::new(store, selected)
    }

    /// Number of texts sent to the embedder per request during ingestion.
    pub fn with_embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch_size = size.max(1);
        self
    }

    /// Open the workspace index.
    ///
    /// A fresh index selects its embedder from configuration; an existing one
    /// rebuilds the provider its manifest recorded.
    pub async fn open(config: &AppConfig) -> AppResult<Self> {
        let index_dir = config.index_dir();
        let api_key = config.resolve_api_key();

        let selected = match IndexManifest::load(&index_dir)? {
            Some(manifest) => {
                select_recorded(&config.embedding, api_key.as_deref(), &manifest).await?
            }
            None => select_provider(&config.embedding, api_key.as_deref()).await?,
        };

        Ok(Self::open_at(&index_dir, selected)
            .await?
            .with_embed_batch_size(config.embedding.primary.batch_size))
    }

    /// Open a LanceDB index in `index_dir` with an already selected embedder.
    ///
    /// A fresh directory records the selection in its manifest; an existing
    /// one must match it.
    pub async fn open_at(index_dir: &Path, selected: SelectedProvider) -> AppResult<Self> {
        match IndexManifest::load(index_dir)? {
            Some(manifest) => {
                manifest.validate_consistency(&selected.selection)?;
                tracing::debug!("Index manifest matches selected embedder");
            }
            None => {
                IndexManifest::from_selection(&selected.selection).save(index_dir)?;
            }
        }

        let store = LanceDbIndex::open(index_dir, selected.selection.dimensions).await?;

        Ok(Self::new(Arc::new(store), selected))
    }

    pub fn selection(&self) -> &ProviderSelection {
        &self.selection
    }

    /// Ingest a batch. Every record is validated and embedded before anything
    /// is written; the batch is then stored in one insert.
    pub async fn ingest(&self, records: &[DocumentRecord]) -> AppResult<IngestStats> {
        let start = Instant::now();

        tracing::info!("Starting ingestion of {} records", records.len());

        let prepared = records
            .iter()
            .enumerate()
            .map(|(position, record)| prepare_record(position, record))
            .collect::<AppResult<Vec<_>>>()?;

        let mut documents = Vec::with_capacity(prepared.len());
        let mut offset = 0;

        for chunk in prepared.chunks(self.embed_batch_size) {
            let texts: Vec<String> = chunk.iter().map(|r| r.text.clone()).collect();

            let embeddings = self.embedder.embed_batch(&texts).await.map_err(|e| {
                AppError::Indexing(format!(
                    "Failed to embed records {}..{} ({}): {}",
                    offset,
                    offset + chunk.len(),
                    chunk
                        .iter()
                        .map(|r| r.id.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    e
                ))
            })?;

            if embeddings.len() != chunk.len() {
                return Err(AppError::Indexing(format!(
                    "Embedder returned {} vectors for {} records starting at position {}",
                    embeddings.len(),
                    chunk.len(),
                    offset
                )));
            }

            for (i, (record, embedding)) in chunk.iter().zip(embeddings).enumerate() {
                if embedding.len() != self.selection.dimensions {
                    return Err(AppError::Indexing(format!(
                        "Record {} (id '{}'): embedding has {} dimensions, expected {}",
                        offset + i,
                        record.id,
                        embedding.len(),
                        self.selection.dimensions
                    )));
                }

                documents.push(IndexedDocument {
                    row_id: uuid::Uuid::new_v4().to_string(),
                    id: record.id.clone(),
                    text: record.text.clone(),
                    access: record.access,
                    version: record.version.clone(),
                    metadata: record.metadata.clone(),
                    embedding,
                });
            }

            offset += chunk.len();
        }

        self.store.insert(&documents).await?;

        if let Err(e) = self.store.flush().await {
            tracing::warn!(error = %e, "Index flush failed after ingestion");
        }

        let stats = IngestStats {
            documents: documents.len(),
            duration_secs: start.elapsed().as_secs_f64(),
        };

        tracing::info!(
            documents = stats.documents,
            duration_secs = stats.duration_secs,
            "Ingestion complete"
        );

        Ok(stats)
    }

    /// Up to `limit` nearest entries, ascending by distance. No access
    /// filtering happens here.
    pub async fn query(&self, text: &str, limit: usize) -> AppResult<Vec<RetrievalResult>> {
        let embedding = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to embed query: {}", e)))?;

        let hits = self.store.search(&embedding, limit).await.map_err(|e| match e {
            AppError::Retrieval(_) => e,
            other => AppError::Retrieval(other.to_string()),
        })?;

        tracing::debug!("Index returned {} of {} requested entries", hits.len(), limit);

        Ok(hits
            .into_iter()
            .map(|(doc, score)| RetrievalResult::from_indexed(doc, score))
            .collect())
    }

    pub async fn stats(&self) -> AppResult<IndexStats> {
        Ok(IndexStats {
            entries: self.store.count().await?,
            distinct_ids: self.store.distinct_ids().await?,
            provider: self.selection.provider.clone(),
            model: self.selection.model.clone(),
            dimensions: self.selection.dimensions,
            fallback_used: self.selection.fallback_used,
        })
    }
}

/// Stamp id/access/version, merge caller metadata over them and read the
/// effective fields back.
fn prepare_record(position: usize, record: &DocumentRecord) -> AppResult<PreparedRecord> {
    let fail = |id: &str, reason: String| {
        AppError::Indexing(format!("Record {} (id '{}'): {}", position, id, reason))
    };

    if record.id.trim().is_empty() {
        return Err(fail(&record.id, "id is empty".to_string()));
    }
    if record.text.trim().is_empty() {
        return Err(fail(&record.id, "text is empty".to_string()));
    }

    let version = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

    let mut metadata = Metadata::new();
    metadata.insert(META_ID.to_string(), record.id.clone().into());
    metadata.insert(META_ACCESS.to_string(), record.access.as_str().into());
    metadata.insert(META_VERSION.to_string(), version.into());

    for (key, value) in &record.metadata {
        if metadata.contains_key(key) {
            tracing::warn!(
                id = %record.id,
                position,
                key = %key,
                "Caller metadata overrides a stamped field"
            );
        }
        metadata.insert(key.clone(), value.clone());
    }

    let effective = |key: &str| -> AppResult<String> {
        metadata
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| fail(&record.id, format!("metadata '{}' must be a string", key)))
    };

    let id = effective(META_ID)?;
    if id.trim().is_empty() {
        return Err(fail(&record.id, "overriding id is empty".to_string()));
    }

    let access: AccessLevel = effective(META_ACCESS)?
        .parse()
        .map_err(|e: AppError| fail(&record.id, e.to_string()))?;

    let version = effective(META_VERSION)?;

    Ok(PreparedRecord {
        id,
        text: record.text.clone(),
        access,
        version,
        metadata,
    })
}
