//! Embedding provider implementations.

pub mod mock;
pub mod ollama;
pub mod openai;
pub mod trigram;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use trigram::TrigramProvider;
