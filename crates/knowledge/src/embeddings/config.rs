//! Embedding configuration and the index manifest.
//!
//! The manifest pins the embedder an index was built with. Vectors from a
//! different provider, model or dimension are not comparable, so reopening
//! with a mismatched selection is refused.

use super::provider::ProviderSelection;
use chrono::Utc;
use regiguard_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use regiguard_core::EmbeddingConfig;

const MANIFEST_FILE: &str = "manifest.yaml";

/// Embedder recorded alongside an index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexManifest {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    #[serde(default)]
    pub fallback_used: bool,
    pub created_at: String,
}

impl IndexManifest {
    pub fn from_selection(selection: &ProviderSelection) -> Self {
        Self {
            provider: selection.provider.clone(),
            model: selection.model.clone(),
            dimensions: selection.dimensions,
            fallback_used: selection.fallback_used,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn path(index_dir: &Path) -> PathBuf {
        index_dir.join(MANIFEST_FILE)
    }

    /// Load the manifest, `None` for a fresh index.
    pub fn load(index_dir: &Path) -> AppResult<Option<Self>> {
        let manifest_path = Self::path(index_dir);

        if !manifest_path.exists() {
            tracing::debug!("No manifest at {:?}, treating index as new", manifest_path);
            return Ok(None);
        }

        let content = fs::read_to_string(&manifest_path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read manifest at {:?}: {}",
                manifest_path, e
            ))
        })?;

        let manifest = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!(
                "Failed to parse manifest at {:?}: {}",
                manifest_path, e
            ))
        })?;

        Ok(Some(manifest))
    }

    pub fn save(&self, index_dir: &Path) -> AppResult<()> {
        fs::create_dir_all(index_dir).map_err(|e| {
            AppError::Config(format!("Failed to create index directory: {}", e))
        })?;

        let manifest_path = Self::path(index_dir);
        let yaml = serde_yaml::to_string(self)?;

        fs::write(&manifest_path, yaml).map_err(|e| {
            AppError::Config(format!(
                "Failed to write manifest to {:?}: {}",
                manifest_path, e
            ))
        })?;

        tracing::debug!("Saved index manifest to {:?}", manifest_path);
        Ok(())
    }

    /// Validate that a provider selection is consistent with this manifest.
    pub fn validate_consistency(&self, selection: &ProviderSelection) -> AppResult<()> {
        if self.provider != selection.provider {
            return Err(AppError::Config(format!(
                "Provider mismatch: index built with '{}', got '{}'",
                self.provider, selection.provider
            )));
        }

        if self.model != selection.model {
            return Err(AppError::Config(format!(
                "Model mismatch: index built with '{}', got '{}'",
                self.model, selection.model
            )));
        }

        if self.dimensions != selection.dimensions {
            return Err(AppError::Config(format!(
                "Dimension mismatch: index built with {}, got {}",
                self.dimensions, selection.dimensions
            )));
        }

        Ok(())
    }
}
