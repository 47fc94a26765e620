//! Prompt loader for YAML prompt overrides.

use crate::types::PromptDefinition;
use ragent_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt definition by ID from a prompts directory.
///
/// This function reads `<prompts_dir>/<id>.yml`; the workspace keeps its
/// overrides in `.ragent/prompts/`.
///
/// # Example
/// ```no_run
/// use ragent_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new(".ragent/prompts"), "rag.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(prompts_dir: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir.join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

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

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List the prompt IDs present in a prompts directory.
pub fn list_prompts(prompts_dir: &Path) -> AppResult<Vec<String>> {
    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

/// Resolve a built-in prompt against an optional override on disk.
///
/// The override must keep the built-in's ID and reference every variable the
/// built-in requires. Any problem with an override is a configuration error.
pub fn resolve_prompt(prompts_dir: &Path, builtin: &PromptDefinition) -> AppResult<PromptDefinition> {
    let override_file = prompts_dir.join(format!("{}.yml", builtin.id));
    if !override_file.exists() {
        return Ok(builtin.clone());
    }

    let mut definition = load_prompt(prompts_dir, &builtin.id)
        .map_err(|e| AppError::Config(format!("Invalid prompt override: {}", e)))?;

    if definition.id != builtin.id {
        return Err(AppError::Config(format!(
            "Prompt override {:?} declares id '{}', expected '{}'",
            override_file, definition.id, builtin.id
        )));
    }

    let missing: Vec<&str> = builtin
        .variables
        .iter()
        .filter(|var| !references_variable(&definition.template, var))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Config(format!(
            "Prompt override {:?} must reference: {}",
            override_file,
            missing.join(", ")
        )));
    }

    definition.variables = builtin.variables.clone();
    tracing::info!("Using prompt override for {}", builtin.id);
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
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

    for var in &def.variables {
        if !references_variable(&def.template, var) {
            return Err(AppError::Prompt(format!(
                "Prompt '{}' declares variable '{}' but the template never uses it",
                def.id, var
            )));
        }
    }

    Ok(())
}

/// Whether `template` contains a `{{name}}` expression (spacing and triple
/// braces allowed).
fn references_variable(template: &str, name: &str) -> bool {
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            return false;
        };
        let expr = after[..close].trim_start_matches('{').trim_start_matches('~').trim();
        if expr == name {
            return true;
        }
        rest = &after[close + 2..];
    }
    false
}
