//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use flashcards_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Every variable listed under `input.variables` must be present, although
/// its value may be empty (an empty context block is a valid input).
///
/// # Example
/// ```no_run
/// use flashcards_prompt::{build_prompt, builtin_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt()?;
/// let mut vars = HashMap::new();
/// vars.insert("topic".to_string(), "Fotosintesis".to_string());
/// vars.insert("context".to_string(), "Fotosintesis terjadi di kloroplas.".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        "Building prompt: {} (language: {})",
        definition.id,
        display_language(&definition.behavior.language)
    );

    let missing: Vec<&str> = definition
        .input
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

    let rendered = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        rendered,
        definition.id.clone(),
        definition.output.is_json(),
        definition.behavior.language.clone(),
        variables,
    ))
}

fn display_language(language: &str) -> &str {
    if language.is_empty() {
        "unspecified"
    } else {
        language
    }
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Context is plain text; HTML escaping would mangle quotes in the passages
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutputFormat, PromptBehavior, PromptInputSpec, PromptOutputSpec};

    fn create_test_definition() -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            behavior: PromptBehavior {
                language: "id".to_string(),
            },
            input: PromptInputSpec {
                variables: vec!["topic".to_string(), "context".to_string()],
            },
            template: "Topik: {{topic}}\nKonteks:\n{{context}}".to_string(),
            output: PromptOutputSpec {
                format: OutputFormat::Json,
            },
        }
    }

    fn vars(topic: &str, context: &str) -> HashMap<String, String> {
        HashMap::from([
            ("topic".to_string(), topic.to_string()),
            ("context".to_string(), context.to_string()),
        ])
    }

    #[test]
    fn test_render_simple_template() {
        let result = render_template("Topik: {{topic}}", &vars("DNA", ""));
        assert_eq!(result.unwrap(), "Topik: DNA");
    }

    #[test]
    fn test_context_is_not_html_escaped() {
        let def = create_test_definition();
        let built = build_prompt(&def, vars("Sel", "\"pembangkit tenaga\" & <ATP>")).unwrap();
        assert!(built.user.contains("\"pembangkit tenaga\" & <ATP>"));
    }

    #[test]
    fn test_build_prompt_metadata() {
        let def = create_test_definition();
        let built = build_prompt(&def, vars("DNA", "heliks ganda")).unwrap();

        assert_eq!(built.user, "Topik: DNA\nKonteks:\nheliks ganda");
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
        assert!(built.metadata.json_output);
        assert_eq!(built.metadata.language, "id");
    }

    #[test]
    fn test_empty_context_is_allowed() {
        let def = create_test_definition();
        assert!(build_prompt(&def, vars("DNA", "")).is_ok());
    }

    #[test]
    fn test_missing_variable_is_error() {
        let def = create_test_definition();
        let only_topic = HashMap::from([("topic".to_string(), "DNA".to_string())]);

        match build_prompt(&def, only_topic) {
            Err(AppError::Prompt(msg)) => assert!(msg.contains("context")),
            other => panic!("expected prompt error, got {other:?}"),
        }
    }
}
