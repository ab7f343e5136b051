//! Prompt loader for YAML prompt definitions.
//!
//! A workspace may override any prompt by placing `<id>.yml` under
//! `.flashcards/prompts/`. The default flashcard prompt is compiled in.

use crate::types::PromptDefinition;
use flashcards_core::{AppError, AppResult};
use std::path::Path;

/// Identifier of the built-in flashcard prompt.
pub const BUILTIN_PROMPT_ID: &str = "flashcards.default";

const BUILTIN_PROMPT_YAML: &str = include_str!("../prompts/flashcards.default.yml");

/// Load the compiled-in few-shot flashcard prompt.
pub fn builtin_prompt() -> AppResult<PromptDefinition> {
    parse_prompt(BUILTIN_PROMPT_YAML, "built-in prompt")
}

/// Load a prompt definition by ID.
///
/// Looks for `.flashcards/prompts/<id>.yml` in the workspace first and falls
/// back to the built-in prompt when `prompt_id` names it.
///
/// # Example
/// ```no_run
/// use flashcards_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "flashcards.default")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".flashcards/prompts")
        .join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        tracing::debug!("Loading prompt from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        let definition = parse_prompt(&contents, &prompt_file.display().to_string())?;

        if definition.id != prompt_id {
            tracing::warn!(
                "Prompt file {:?} declares id '{}', expected '{}'",
                prompt_file,
                definition.id,
                prompt_id
            );
        }

        tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);
        return Ok(definition);
    }

    if prompt_id == BUILTIN_PROMPT_ID {
        return builtin_prompt();
    }

    Err(AppError::Prompt(format!(
        "Prompt '{}' not found (looked for {:?})",
        prompt_id, prompt_file
    )))
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e)))?;

    validate_prompt(&definition)?;
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

    // Simple "x.y" check
    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    for variable in &def.input.variables {
        if !def.template.contains(&format!("{{{{{}}}}}", variable)) {
            return Err(AppError::Prompt(format!(
                "Prompt '{}' declares variable '{}' but its template never uses it",
                def.id, variable
            )));
        }
    }

    Ok(())
}
