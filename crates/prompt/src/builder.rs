//! Prompt builder: renders Handlebars templates with input variables.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use regiguard_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// # Example
/// ```no_run
/// use regiguard_prompt::{build_prompt, builtin_prompt, ANSWER_PROMPT_ID};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(ANSWER_PROMPT_ID).unwrap();
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What does Article 5 say?".to_string());
/// vars.insert("context".to_string(), String::new());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let user = render_template(&definition.template, &variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?;

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{builtin_prompt, ANSWER_PROMPT_ID};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_simple_template() {
        let result = render_template("Question: {{question}}", &vars(&[("question", "Hi")]));
        assert_eq!(result.unwrap(), "Question: Hi");
    }

    #[test]
    fn test_context_is_not_html_escaped() {
        let def = builtin_prompt(ANSWER_PROMPT_ID).unwrap();
        let built = build_prompt(
            &def,
            vars(&[
                ("question", "Is <this> & that covered?"),
                ("context", "[gdpr_article5]\nData shall be processed lawfully."),
            ]),
        )
        .unwrap();

        assert!(built.user.contains("Is <this> & that covered?"));
        assert!(built.user.contains("[gdpr_article5]\nData shall be processed lawfully."));
        assert!(built.system.is_none());
        assert_eq!(built.metadata.source_prompt_id, ANSWER_PROMPT_ID);
    }

    #[test]
    fn test_system_template_is_rendered() {
        let def = PromptDefinition {
            id: "p".to_string(),
            title: "P".to_string(),
            api_version: "1.0".to_string(),
            system: Some("Role: {{role}}".to_string()),
            template: "{{question}}".to_string(),
        };
        let built = build_prompt(&def, vars(&[("role", "officer"), ("question", "q")])).unwrap();
        assert_eq!(built.system.as_deref(), Some("Role: officer"));
    }

    #[test]
    fn test_render_template_missing_variable() {
        // Handlebars renders missing variables as empty string
        let result = render_template("Question: {{missing}}", &HashMap::new());
        assert_eq!(result.unwrap(), "Question: ");
    }
}
