//! Grounded answer generation.

use crate::types::RetrievalResult;
use regiguard_core::{AppError, AppResult};
use regiguard_llm::{LlmClient, LlmRequest};
use regiguard_prompt::{answer_prompt, build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds the grounded prompt from retrieved documents and asks the
/// completion service for an answer. No retries.
#[derive(Clone)]
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    timeout: Duration,
    max_tokens: Option<u32>,
}

impl std::fmt::Debug for AnswerGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerGenerator")
            .field("provider", &self.client.provider_name())
            .field("model", &self.model)
            .field("prompt", &self.prompt.id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            prompt: answer_prompt(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
            max_tokens: None,
        }
    }

    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// `[id]\ntext` blocks separated by a blank line.
    pub fn build_context(docs: &[RetrievalResult]) -> String {
        docs.iter()
            .map(|doc| format!("[{}]\n{}", doc.id, doc.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub async fn answer(&self, question: &str, docs: &[RetrievalResult]) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("context".to_string(), Self::build_context(docs));
        variables.insert("question".to_string(), question.to_string());

        let built = build_prompt(&self.prompt, variables)
            .map_err(|e| AppError::Generation(format!("Failed to build prompt: {}", e)))?;

        let mut request = LlmRequest::new(built.user, self.model.clone()).with_temperature(0.0);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            provider = self.client.provider_name(),
            model = %self.model,
            context_docs = docs.len(),
            "Requesting grounded answer"
        );

        let response = tokio::time::timeout(self.timeout, self.client.complete(&request))
            .await
            .map_err(|_| {
                AppError::Generation(format!(
                    "Completion timed out after {}s",
                    self.timeout.as_secs_f64()
                ))
            })?
            .map_err(|e| AppError::Generation(e.to_string()))?;

        Ok(response.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessLevel, Metadata};
    use regiguard_llm::{LlmResponse, MockLlmClient};

    fn doc(id: &str, text: &str) -> RetrievalResult {
        RetrievalResult {
            id: id.to_string(),
            text: text.to_string(),
            score: 0.1,
            access: AccessLevel::Public,
            version: "2026-01-01T00:00:00.000000Z".to_string(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_build_context() {
        let context = AnswerGenerator::build_context(&[doc("a", "alpha"), doc("b", "beta")]);
        assert_eq!(context, "[a]\nalpha\n\n[b]\nbeta");
        assert_eq!(AnswerGenerator::build_context(&[]), "");
    }

    #[tokio::test]
    async fn test_answer_uses_grounded_prompt_and_zero_temperature() {
        let client = Arc::new(MockLlmClient::new());
        client.push_response("  Data must be processed lawfully. [gdpr_article5]\n");

        let generator = AnswerGenerator::new(client.clone(), "gpt-4o-mini");
        let answer = generator
            .answer(
                "What does Article 5 say?",
                &[doc("gdpr_article5", "Personal data shall be processed lawfully")],
            )
            .await
            .unwrap();

        assert_eq!(answer, "Data must be processed lawfully. [gdpr_article5]");

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, Some(0.0));
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert!(requests[0].prompt.contains("Use ONLY the provided context"));
        assert!(requests[0]
            .prompt
            .contains("[gdpr_article5]\nPersonal data shall be processed lawfully"));
        assert!(requests[0].prompt.contains("Question: What does Article 5 say?"));
    }

    #[tokio::test]
    async fn test_client_error_is_generation_error() {
        let client = Arc::new(MockLlmClient::new());
        client.push_error("rate limited");

        let err = AnswerGenerator::new(client, "m")
            .answer("q", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "generation");
        assert!(err.to_string().contains("rate limited"));
    }

    #[derive(Debug)]
    struct HangingClient;

    #[async_trait::async_trait]
    impl LlmClient for HangingClient {
        fn provider_name(&self) -> &str {
            "hanging"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_timeout_is_generation_error() {
        let err = AnswerGenerator::new(Arc::new(HangingClient), "m")
            .with_timeout(Duration::from_millis(20))
            .answer("q", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "generation");
        assert!(err.to_string().contains("timed out"));
    }
}
