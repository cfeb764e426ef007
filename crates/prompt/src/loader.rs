//! Prompt loader for built-in and workspace prompt definitions.

use crate::types::PromptDefinition;
use cardio_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Identifiers of the prompts compiled into the binary.
pub const BUILTIN_PROMPT_IDS: [&str; 2] = [crate::MEDICAL_QA, crate::MEDICAL_QA_SIMPLIFIED];

const MEDICAL_QA_YAML: &str = include_str!("../prompts/medical.qa.yml");
const MEDICAL_QA_SIMPLIFIED_YAML: &str = include_str!("../prompts/medical.qa.simplified.yml");

/// Directory holding workspace prompt overrides.
fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".cardio/prompts")
}

/// Parse one of the built-in prompt definitions.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<PromptDefinition> {
    let yaml = match prompt_id {
        crate::MEDICAL_QA => MEDICAL_QA_YAML,
        crate::MEDICAL_QA_SIMPLIFIED => MEDICAL_QA_SIMPLIFIED_YAML,
        other => {
            return Err(AppError::Prompt(format!(
                "No built-in prompt named '{}'",
                other
            )))
        }
    };

    let definition: PromptDefinition = serde_yaml::from_str(yaml).map_err(|e| {
        AppError::Prompt(format!("Failed to parse built-in prompt '{}': {}", prompt_id, e))
    })?;
    validate_prompt(&definition)?;

    Ok(definition)
}

/// Load a prompt definition by ID.
///
/// A workspace file `.cardio/prompts/<id>.yml` takes precedence over the
/// built-in definition of the same ID.
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        tracing::debug!("Using built-in prompt '{}'", prompt_id);
        return builtin_prompt(prompt_id);
    }

    tracing::debug!("Loading prompt override from: {:?}", prompt_file);

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

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file, definition.id, prompt_id
        )));
    }

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List all available prompt IDs: built-ins plus workspace overrides.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids: Vec<String> = BUILTIN_PROMPT_IDS.iter().map(|s| s.to_string()).collect();

    let dir = prompts_dir(workspace_path);
    if !dir.exists() {
        return Ok(prompt_ids);
    }

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !prompt_ids.iter().any(|id| id == stem) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    Ok(prompt_ids)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
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
