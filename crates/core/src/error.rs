//! Error types for RegiGuard.
//!
//! One enum covers every failure category in the workspace. The pipeline
//! categories (configuration, indexing, retrieval, generation, reflection,
//! validation) are what callers match on; the provider-level variants are
//! wrapped by the component that owns the failing operation.

use thiserror::Error;

/// Unified error type for RegiGuard.
///
/// All fallible functions return `Result<T, AppError>`. A weakly grounded
/// answer (`ok == false`) is a normal result, never an error.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors, including both embedding providers failing to
    /// initialize and index manifest mismatches.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ingestion failed for a document (message names the record).
    #[error("Indexing error: {0}")]
    Indexing(String),

    /// The index query itself failed. Zero results is not an error.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The generative completion call failed or timed out.
    #[error("Generation error: {0}")]
    Generation(String),

    /// The relevance check failed or timed out.
    #[error("Reflection error: {0}")]
    Reflection(String),

    /// Malformed caller input (k <= 0, unknown role, empty question).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Short machine-readable category name, used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "configuration",
            AppError::Indexing(_) => "indexing",
            AppError::Retrieval(_) => "retrieval",
            AppError::Generation(_) => "generation",
            AppError::Reflection(_) => "reflection",
            AppError::Validation(_) => "validation",
            AppError::Embedding(_) => "embedding",
            AppError::Llm(_) => "llm",
            AppError::Prompt(_) => "prompt",
            AppError::Io(_) => "io",
            AppError::Serialization(_) => "serialization",
            AppError::Other(_) => "other",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_category() {
        let err = AppError::Validation("k must be greater than zero".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: k must be greater than zero"
        );
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_json_error_converts_to_serialization() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert_eq!(err.kind(), "serialization");
    }
}
