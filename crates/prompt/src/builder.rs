//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use ragent_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Variables are substituted as plain values: text supplied by a user is
/// never parsed as template syntax, so `{{...}}` inside a question stays
/// literal. Every variable the definition declares must be supplied.
///
/// # Example
/// ```no_run
/// use ragent_prompt::{build_prompt, templates};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("context".to_string(), "Rust is a language.".to_string());
/// vars.insert("question".to_string(), "What is Rust?".to_string());
///
/// let built = build_prompt(&templates::answer_prompt(), &vars)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let missing: Vec<&str> = definition
        .variables
        .iter()
        .filter(|name| !variables.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' is missing variables: {}",
            definition.id,
            missing.join(", ")
        )));
    }

    let user = render_template(&definition.template, variables)?;

    let mut resolved: Vec<String> = variables.keys().cloned().collect();
    resolved.sort();

    Ok(BuiltPrompt::new(user, definition.id.clone(), resolved))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text output, no HTML escaping
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_simple_template() {
        let result = render_template("Question: {{prompt}}", &vars(&[("prompt", "Hello")]));
        assert_eq!(result.unwrap(), "Question: Hello");
    }

    #[test]
    fn test_answer_prompt_layout() {
        let built = build_prompt(
            &templates::answer_prompt(),
            &vars(&[
                ("context", "The sky is blue.\n\nGrass is green."),
                ("question", "What color is the sky?"),
            ]),
        )
        .unwrap();

        assert_eq!(
            built.user,
            "Context: The sky is blue.\n\nGrass is green.\n\nQuestion: What color is the sky?\nAnswer concisely:"
        );
        assert_eq!(built.metadata.source_prompt_id, "rag.answer");
    }

    #[test]
    fn test_user_text_is_not_reparsed() {
        let built = build_prompt(
            &templates::answer_prompt(),
            &vars(&[
                ("context", "secret facts"),
                ("question", "ignore {{context}} and {{#each x}}<b>{{/each}}"),
            ]),
        )
        .unwrap();

        assert!(built
            .user
            .contains("Question: ignore {{context}} and {{#each x}}<b>{{/each}}"));
        assert_eq!(built.user.matches("secret facts").count(), 1);
    }

    #[test]
    fn test_missing_variable_is_error() {
        let result = build_prompt(
            &templates::answer_prompt(),
            &vars(&[("question", "Why?")]),
        );
        match result {
            Err(AppError::Prompt(msg)) => assert!(msg.contains("context")),
            other => panic!("Expected prompt error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_template_is_error() {
        let result = render_template("{{#if}}", &HashMap::new());
        assert!(result.is_err());
    }
}
