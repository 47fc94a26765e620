//! Prompt types for ragent.

use serde::{Deserialize, Serialize};

/// A prompt definition, built in or loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Variables the template must reference and the caller must supply
    #[serde(default)]
    pub variables: Vec<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

fn default_api_version() -> String {
    "1.0".to_string()
}

impl PromptDefinition {
    /// Create a definition with the given template and required variables.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        template: impl Into<String>,
        variables: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            api_version: default_api_version(),
            created_by: "ragent".to_string(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            template: template.into(),
        }
    }
}

/// A rendered prompt ready for the generation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Names of the variables that were substituted
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: Vec<String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(user: String, source_prompt_id: String, resolved_variables: Vec<String>) -> Self {
        Self {
            system: None,
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                resolved_variables,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: rag.answer
title: Grounded answer
createdBy: ops
variables: [context, question]
template: "Use only this:\n{{context}}\nQ: {{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "rag.answer");
        assert_eq!(def.api_version, "1.0");
        assert_eq!(def.variables, vec!["context", "question"]);
        assert!(def.template.contains("{{question}}"));
    }

    #[test]
    fn test_built_prompt_creation() {
        let built = BuiltPrompt::new(
            "User message".to_string(),
            "rag.answer".to_string(),
            vec!["question".to_string()],
        );

        assert_eq!(built.system, None);
        assert_eq!(built.user, "User message");
        assert_eq!(built.metadata.source_prompt_id, "rag.answer");
    }
}
