//! Prompt system for RegiGuard.
//!
//! - YAML prompt definitions, overridable per workspace
//! - A built-in grounded-answer prompt
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{answer_prompt, builtin_prompt, load_prompt, ANSWER_PROMPT_ID};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
