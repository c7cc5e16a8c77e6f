//! Scripted completion client for tests and offline runs.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use regiguard_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Completion client that replays scripted responses and records every
/// request it receives.
///
/// When the script is empty it falls back to a fixed reply, so a default
/// instance can stand in for a real provider.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<AppResult<String>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `content` whenever the script is exhausted.
    pub fn with_fallback(content: impl Into<String>) -> Self {
        Self {
            fallback: Some(content.into()),
            ..Self::default()
        }
    }

    /// Queue a successful response.
    pub fn push_response(&self, content: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(content.into()));
        }
    }

    /// Queue a failure.
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(AppError::Llm(message.into())));
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> AppResult<String> {
        let scripted = self
            .script
            .lock()
            .map_err(|e| AppError::Llm(format!("mock script poisoned: {}", e)))?
            .pop_front();

        match scripted {
            Some(reply) => reply,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| AppError::Llm("mock client has no scripted response".to_string())),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let content = self.next_reply()?;
        let prompt_tokens = request.prompt.split_whitespace().count() as u32;
        let completion_tokens = content.split_whitespace().count() as u32;

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::new(prompt_tokens, completion_tokens),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_fallback() {
        let client = MockLlmClient::with_fallback("default reply");
        client.push_response("first");

        let request = LlmRequest::new("prompt", "mock-model");
        assert_eq!(client.complete(&request).await.unwrap().content, "first");
        assert_eq!(
            client.complete(&request).await.unwrap().content,
            "default reply"
        );
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let client = MockLlmClient::new();
        client.push_error("service unavailable");

        let request = LlmRequest::new("prompt", "mock-model");
        let err = client.complete(&request).await.unwrap_err();
        assert!(err.to_string().contains("service unavailable"));
    }

    #[tokio::test]
    async fn test_empty_script_without_fallback_fails() {
        let client = MockLlmClient::new();
        let request = LlmRequest::new("prompt", "mock-model");
        assert!(client.complete(&request).await.is_err());
    }
}
