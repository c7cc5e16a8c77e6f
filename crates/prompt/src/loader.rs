//! Prompt loader.
//!
//! Workspace files in `.regiguard/prompts/<id>.yml` take precedence over the
//! built-in definitions.

use crate::types::PromptDefinition;
use regiguard_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Identifier of the grounded-answer prompt.
pub const ANSWER_PROMPT_ID: &str = "compliance.answer";

const ANSWER_TEMPLATE: &str = "You are RegiGuard, a compliance assistant. \
Use ONLY the provided context to answer the question.

Context:
{{context}}

Question: {{question}}

Provide a concise answer (2-6 sentences). \
At the end, list source ids in square brackets like [doc_id].";

/// The built-in grounded-answer prompt.
pub fn answer_prompt() -> PromptDefinition {
    PromptDefinition {
        id: ANSWER_PROMPT_ID.to_string(),
        title: "Grounded compliance answer".to_string(),
        api_version: "1.0".to_string(),
        system: None,
        template: ANSWER_TEMPLATE.to_string(),
    }
}

/// Built-in prompt definitions, looked up by id.
pub fn builtin_prompt(prompt_id: &str) -> Option<PromptDefinition> {
    match prompt_id {
        ANSWER_PROMPT_ID => Some(answer_prompt()),
        _ => None,
    }
}

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".regiguard").join("prompts")
}

/// Load a prompt definition by ID.
///
/// # Arguments
/// * `workspace_path` - Root workspace directory containing `.regiguard/`
/// * `prompt_id` - Prompt identifier (e.g., "compliance.answer")
///
/// # Example
/// ```no_run
/// use regiguard_prompt::{load_prompt, ANSWER_PROMPT_ID};
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), ANSWER_PROMPT_ID)?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        return builtin_prompt(prompt_id).ok_or_else(|| {
            AppError::Prompt(format!(
                "Prompt '{}' not found (looked in {:?})",
                prompt_id, prompt_file
            ))
        });
    }

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, content: &str) {
        let prompts = prompts_dir(dir);
        fs::create_dir_all(&prompts).unwrap();
        fs::write(prompts.join(format!("{}.yml", id)), content).unwrap();
    }

    #[test]
    fn test_builtin_answer_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_prompt(temp_dir.path(), ANSWER_PROMPT_ID).unwrap();
        assert_eq!(prompt.id, ANSWER_PROMPT_ID);
        assert!(prompt.template.contains("Use ONLY the provided context"));
        assert!(prompt.template.contains("[doc_id]"));
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            ANSWER_PROMPT_ID,
            "id: compliance.answer\ntitle: Custom\napiVersion: \"1.1\"\ntemplate: \"Q: {{question}}\"\n",
        );

        let prompt = load_prompt(temp_dir.path(), ANSWER_PROMPT_ID).unwrap();
        assert_eq!(prompt.title, "Custom");
        assert_eq!(prompt.template, "Q: {{question}}");
    }

    #[test]
    fn test_load_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "broken", "invalid: yaml: content:");
        assert!(load_prompt(temp_dir.path(), "broken").is_err());
    }
}
