//! Compliance knowledge and answering pipeline.
//!
//! Version-stamped document ingestion into a vector index, role-scoped
//! retrieval, grounded answer generation and an independent relevance check.
//!
//! # Example
//! ```no_run
//! use regiguard_core::AppConfig;
//! use regiguard_knowledge::{Pipeline, Role};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let pipeline = Pipeline::from_config(&config).await?;
//! let result = pipeline.run("What does Article 5 say?", Role::Analyst, 3).await?;
//! println!("{} (relevance {:.2})", result.answer, result.relevance);
//! # Ok(())
//! # }
//! ```

pub mod embeddings;
pub mod generator;
pub mod index;
pub mod lancedb_index;
pub mod memory_index;
pub mod pipeline;
pub mod planner;
pub mod reflector;
pub mod retriever;
pub mod samples;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{EmbeddingProvider, ProviderSelection, SelectedProvider};
pub use generator::AnswerGenerator;
pub use index::DocumentIndex;
pub use lancedb_index::LanceDbIndex;
pub use memory_index::MemoryIndex;
pub use pipeline::{Pipeline, QueryLogEntry, QueryObserver, TracingObserver};
pub use planner::{IntentPlanner, IntentRule};
pub use reflector::Reflector;
pub use retriever::Retriever;
pub use types::{
    AccessLevel, DocumentRecord, IndexStats, IndexedDocument, IngestStats, Metadata,
    PipelineResult, QueryPlan, QueryRequest, Reflection, RetrievalResult, Role,
};
pub use vector_index::VectorIndex;
