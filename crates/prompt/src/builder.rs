//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use cardio_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Both the optional system template and the user template are rendered
/// with the same variables.
///
/// # Example
/// ```no_run
/// use cardio_prompt::{build_prompt, builtin_prompt, MEDICAL_QA};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(MEDICAL_QA)?;
/// let mut vars = HashMap::new();
/// vars.insert("context".to_string(), "L'hypertension...".to_string());
/// vars.insert("question".to_string(), "Qu'est-ce que l'hypertension ?".to_string());
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

    let handlebars = registry();

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(&handlebars, template, &variables))
        .transpose()?;
    let user = render_template(&handlebars, &definition.template, &variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        source_prompt_id: definition.id.clone(),
        resolved_variables: variables,
    })
}

/// Create a Handlebars registry that renders plain text.
fn registry() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
}

/// Render a Handlebars template with variables.
fn render_template(
    handlebars: &Handlebars<'static>,
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    handlebars
        .render_template(template, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::builtin_prompt;

    fn vars(context: &str, question: &str) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.to_string());
        vars.insert("question".to_string(), question.to_string());
        vars
    }

    #[test]
    fn test_build_medical_prompt() {
        let def = builtin_prompt(crate::MEDICAL_QA).unwrap();
        let built = build_prompt(
            &def,
            vars("L'angine de poitrine est une douleur.", "Qu'est-ce que l'angine ?"),
        )
        .unwrap();

        assert!(built.user.contains("L'angine de poitrine est une douleur."));
        assert!(built.user.contains("Question: Qu'est-ce que l'angine ?"));
        assert!(built
            .system
            .as_deref()
            .unwrap()
            .contains("uniquement les informations du contexte"));
        assert_eq!(built.source_prompt_id, crate::MEDICAL_QA);
    }

    #[test]
    fn test_no_html_escaping() {
        let def = PromptDefinition {
            id: "t".to_string(),
            title: "t".to_string(),
            api_version: "1.0".to_string(),
            created_by: String::new(),
            system: None,
            template: "{{question}}".to_string(),
        };
        let built = build_prompt(&def, vars("", "tension < 14 & \"normale\"")).unwrap();
        assert_eq!(built.user, "tension < 14 & \"normale\"");
    }

    #[test]
    fn test_invalid_template() {
        let def = PromptDefinition {
            id: "broken".to_string(),
            title: "Broken".to_string(),
            api_version: "1.0".to_string(),
            created_by: String::new(),
            system: None,
            template: "{{#if}}".to_string(),
        };
        assert!(matches!(
            build_prompt(&def, HashMap::new()),
            Err(AppError::Prompt(_))
        ));
    }
}
