//! Embedding provider trait, factory and primary/fallback selection.

use regiguard_core::config::EmbeddingSettings;
use regiguard_core::{AppError, AppResult, EmbeddingConfig};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use super::config::IndexManifest;
use super::providers::{MockProvider, OllamaProvider, OpenAiProvider, TrigramProvider};

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "openai", "ollama", "trigram", "mock")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Which embedder an index ended up with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSelection {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub fallback_used: bool,
    /// Why the primary was rejected, when it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_error: Option<String>,
}

impl ProviderSelection {
    pub(crate) fn describe(
        provider: &dyn EmbeddingProvider,
        fallback_used: bool,
        primary_error: Option<String>,
    ) -> Self {
        Self {
            provider: provider.provider_name().to_string(),
            model: provider.model_name().to_string(),
            dimensions: provider.dimensions(),
            fallback_used,
            primary_error,
        }
    }
}

/// A provider together with the record of how it was chosen.
#[derive(Debug, Clone)]
pub struct SelectedProvider {
    pub provider: Arc<dyn EmbeddingProvider>,
    pub selection: ProviderSelection,
}

/// Create an embedding provider based on configuration.
///
/// Remote providers verify themselves here, so a returned provider is ready
/// to embed.
pub async fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::Embedding(format!(
            "Embedding provider '{}' configured with zero dimensions",
            config.provider
        )));
    }

    match config.provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(config.dimensions))),

        "mock" => Ok(Arc::new(MockProvider::new(config.dimensions))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(config).await?)),

        "openai" => Ok(Arc::new(OpenAiProvider::new(config, api_key).await?)),

        _ => Err(AppError::Embedding(format!(
            "Unknown embedding provider: '{}'. Supported providers: openai, ollama, trigram, mock",
            config.provider
        ))),
    }
}

/// Try the primary provider once, then the fallback once.
///
/// The fallback future is only polled when the primary fails. Both failing
/// is a configuration error carrying both causes.
pub async fn select_with<P, F>(primary: P, fallback: F) -> AppResult<SelectedProvider>
where
    P: Future<Output = AppResult<Arc<dyn EmbeddingProvider>>>,
    F: Future<Output = AppResult<Arc<dyn EmbeddingProvider>>>,
{
    let primary_error = match primary.await {
        Ok(provider) => {
            let selection = ProviderSelection::describe(provider.as_ref(), false, None);
            tracing::info!(
                provider = %selection.provider,
                model = %selection.model,
                dimensions = selection.dimensions,
                "Selected primary embedding provider"
            );
            return Ok(SelectedProvider { provider, selection });
        }
        Err(e) => e.to_string(),
    };

    tracing::warn!(
        error = %primary_error,
        "Primary embedding provider unavailable, trying fallback"
    );

    match fallback.await {
        Ok(provider) => {
            let selection =
                ProviderSelection::describe(provider.as_ref(), true, Some(primary_error));
            tracing::info!(
                provider = %selection.provider,
                model = %selection.model,
                dimensions = selection.dimensions,
                "Selected fallback embedding provider"
            );
            Ok(SelectedProvider { provider, selection })
        }
        Err(fallback_error) => Err(AppError::Config(format!(
            "No embedding provider available. Primary failed: {}. Fallback failed: {}",
            primary_error, fallback_error
        ))),
    }
}

/// Select the index embedder from configuration.
pub async fn select_provider(
    settings: &EmbeddingSettings,
    api_key: Option<&str>,
) -> AppResult<SelectedProvider> {
    select_with(
        create_provider(&settings.primary, api_key),
        create_provider(&settings.fallback, api_key),
    )
    .await
}

/// Rebuild the embedder an existing index was built with.
///
/// Selection is not re-run: a manifest recorded with the fallback goes
/// straight to the fallback, otherwise the primary is used. Failure to
/// initialize that provider is a configuration error.
pub async fn select_recorded(
    settings: &EmbeddingSettings,
    api_key: Option<&str>,
    manifest: &IndexManifest,
) -> AppResult<SelectedProvider> {
    let (stage, config) = if manifest.fallback_used {
        ("fallback", &settings.fallback)
    } else {
        ("primary", &settings.primary)
    };

    let provider = create_provider(config, api_key).await.map_err(|e| {
        AppError::Config(format!(
            "Index was built with the {} embedding provider '{}', which is unavailable: {}",
            stage, manifest.provider, e
        ))
    })?;

    let selection = ProviderSelection::describe(provider.as_ref(), manifest.fallback_used, None);
    manifest.validate_consistency(&selection)?;

    tracing::info!(
        provider = %selection.provider,
        model = %selection.model,
        fallback_used = selection.fallback_used,
        "Reusing recorded embedding provider"
    );

    Ok(SelectedProvider { provider, selection })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing(
        message: &'static str,
    ) -> impl Future<Output = AppResult<Arc<dyn EmbeddingProvider>>> {
        async move { Err(AppError::Embedding(message.to_string())) }
    }

    fn mock(dimensions: usize) -> impl Future<Output = AppResult<Arc<dyn EmbeddingProvider>>> {
        async move { Ok(Arc::new(MockProvider::new(dimensions)) as Arc<dyn EmbeddingProvider>) }
    }

    #[tokio::test]
    async fn test_create_trigram_provider() {
        let provider = create_provider(&EmbeddingConfig::trigram(), None).await.unwrap();
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[tokio::test]
    async fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "unknown".to_string(),
            ..EmbeddingConfig::trigram()
        };

        let result = create_provider(&config, None).await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_openai_without_key_fails_to_initialize() {
        let result = create_provider(&EmbeddingConfig::openai(), None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_primary_selected_when_healthy() {
        let selected = select_with(mock(64), failing("unused")).await.unwrap();
        assert_eq!(selected.selection.provider, "mock");
        assert_eq!(selected.selection.dimensions, 64);
        assert!(!selected.selection.fallback_used);
        assert!(selected.selection.primary_error.is_none());
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_fails() {
        let selected = select_with(failing("remote down"), mock(32)).await.unwrap();
        assert!(selected.selection.fallback_used);
        assert_eq!(selected.selection.dimensions, 32);
        assert!(selected
            .selection
            .primary_error
            .as_deref()
            .unwrap()
            .contains("remote down"));
    }

    #[tokio::test]
    async fn test_both_failing_is_configuration_error() {
        let err = select_with(failing("remote down"), failing("local broken"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("remote down"));
        assert!(err.to_string().contains("local broken"));
    }

    #[tokio::test]
    async fn test_select_provider_falls_back_to_trigram() {
        let settings = EmbeddingSettings {
            primary: EmbeddingConfig::openai(),
            fallback: EmbeddingConfig::trigram(),
        };

        let selected = select_provider(&settings, None).await.unwrap();
        assert_eq!(selected.selection.provider, "trigram");
        assert!(selected.selection.fallback_used);
    }

    fn mock_primary_settings() -> EmbeddingSettings {
        EmbeddingSettings {
            primary: EmbeddingConfig {
                provider: "mock".to_string(),
                ..EmbeddingConfig::trigram()
            },
            fallback: EmbeddingConfig::trigram(),
        }
    }

    #[tokio::test]
    async fn test_recorded_fallback_skips_healthy_primary() {
        let built = ProviderSelection {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            fallback_used: true,
            primary_error: Some("no key".to_string()),
        };
        let manifest = IndexManifest::from_selection(&built);

        let selected = select_recorded(&mock_primary_settings(), None, &manifest)
            .await
            .unwrap();
        assert_eq!(selected.provider.provider_name(), "trigram");
        assert_eq!(selected.selection.provider, "trigram");
        assert!(selected.selection.fallback_used);
    }

    #[tokio::test]
    async fn test_recorded_primary_unavailable_is_configuration_error() {
        let built = ProviderSelection {
            provider: "openai".to_string(),
            model: "text-embedding-3-large".to_string(),
            dimensions: 3072,
            fallback_used: false,
            primary_error: None,
        };
        let manifest = IndexManifest::from_selection(&built);
        let settings = EmbeddingSettings {
            primary: EmbeddingConfig::openai(),
            fallback: EmbeddingConfig::trigram(),
        };

        let err = select_recorded(&settings, None, &manifest)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("primary embedding provider 'openai'"));
    }
}
