//! Compliance knowledge type definitions.

use regiguard_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Free-form document metadata.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata keys stamped on every stored entry.
pub const META_ID: &str = "id";
pub const META_ACCESS: &str = "access";
pub const META_VERSION: &str = "version";

/// Document visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Public,
    Internal,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Internal => "internal",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(AccessLevel::Public),
            "internal" => Ok(AccessLevel::Internal),
            other => Err(AppError::Validation(format!(
                "Unknown access level: '{}'. Expected 'public' or 'internal'",
                other
            ))),
        }
    }
}

/// Caller role. Trusted as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Officer,
    Analyst,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Officer => "officer",
            Role::Analyst => "analyst",
        }
    }

    /// Access levels this role may read.
    pub fn allowed_access(&self) -> &'static [AccessLevel] {
        match self {
            Role::Analyst => &[AccessLevel::Public],
            Role::Admin | Role::Officer => &[AccessLevel::Public, AccessLevel::Internal],
        }
    }

    pub fn permits(&self, access: AccessLevel) -> bool {
        self.allowed_access().contains(&access)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "officer" => Ok(Role::Officer),
            "analyst" => Ok(Role::Analyst),
            other => Err(AppError::Validation(format!(
                "Unknown role: '{}'. Expected one of: admin, officer, analyst",
                other
            ))),
        }
    }
}

/// A document as handed to ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Caller-assigned id, not unique across versions
    pub id: String,

    pub text: String,

    #[serde(default)]
    pub access: AccessLevel,

    /// Extra metadata merged over the stamped fields
    #[serde(default, alias = "meta")]
    pub metadata: Metadata,
}

impl DocumentRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>, access: AccessLevel) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            access,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A stored, version-stamped entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    /// Internal unique row id (UUID v4)
    pub row_id: String,
    pub id: String,
    pub text: String,
    pub access: AccessLevel,
    /// ISO-8601 UTC ingestion timestamp
    pub version: String,
    /// Merged metadata, always carrying `id`, `access`, `version`
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// One retrieved document. Lower score means more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub access: AccessLevel,
    pub version: String,
    pub metadata: Metadata,
}

impl RetrievalResult {
    pub(crate) fn from_indexed(doc: IndexedDocument, score: f32) -> Self {
        Self {
            id: doc.id,
            text: doc.text,
            score,
            access: doc.access,
            version: doc.version,
            metadata: doc.metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub intent: String,
}

/// Grounding signal for a set of retrieved documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub relevance: f32,
    pub ok: bool,
}

/// Composite answer for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Matches `QueryLogEntry::query_id` for feedback correlation
    #[serde(default)]
    pub query_id: String,
    pub plan: QueryPlan,
    pub docs: Vec<RetrievalResult>,
    pub answer: String,
    pub relevance: f32,
    pub ok: bool,
}

/// Query contract input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub role: String,
    #[serde(default = "default_k", alias = "max_docs")]
    pub k: i64,
}

fn default_k() -> i64 {
    3
}

/// Result of one ingestion batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    pub documents: usize,
    pub duration_secs: f64,
}

/// Index statistics together with the embedding selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub entries: usize,
    pub distinct_ids: usize,
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub fallback_used: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("Analyst".parse::<Role>().unwrap(), Role::Analyst);
        assert_eq!(" ADMIN ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("officer".parse::<Role>().unwrap(), Role::Officer);
    }

    #[test]
    fn test_unknown_role_is_validation_error() {
        let err = "auditor".parse::<Role>().unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_role_access_filter() {
        assert!(Role::Analyst.permits(AccessLevel::Public));
        assert!(!Role::Analyst.permits(AccessLevel::Internal));
        assert!(Role::Officer.permits(AccessLevel::Internal));
        assert!(Role::Admin.permits(AccessLevel::Internal));
    }

    #[test]
    fn test_record_defaults_and_meta_alias() {
        let record: DocumentRecord = serde_json::from_str(
            r#"{"id": "mca_form8", "text": "Form 8 is due", "meta": {"jurisdiction": "IN"}}"#,
        )
        .unwrap();

        assert_eq!(record.access, AccessLevel::Public);
        assert_eq!(record.metadata["jurisdiction"], "IN");
    }

    #[test]
    fn test_record_rejects_unknown_access() {
        let parsed = serde_json::from_str::<DocumentRecord>(
            r#"{"id": "x", "text": "y", "access": "secret"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_query_request_k_alias_and_default() {
        let req: QueryRequest =
            serde_json::from_str(r#"{"question": "q", "role": "admin"}"#).unwrap();
        assert_eq!(req.k, 3);

        let req: QueryRequest =
            serde_json::from_str(r#"{"question": "q", "role": "admin", "max_docs": 5}"#).unwrap();
        assert_eq!(req.k, 5);
    }
}
