//! Answer generation from retrieved chunks.
//!
//! The grounded prompt is tried first. If generation fails, one retry is
//! made with the simplified prompt and the bare question. Both failures are
//! logged and returned together.

use crate::rag::safety::{apply_disclaimer, enrich_question};
use crate::types::{RetrievedChunk, UserContext};
use cardio_core::{AppError, AppResult};
use cardio_llm::{LlmClient, LlmRequest};
use cardio_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Model settings used for every generation call.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    qa_prompt: PromptDefinition,
    simplified_prompt: PromptDefinition,
    settings: GenerationSettings,
}

impl Synthesizer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        qa_prompt: PromptDefinition,
        simplified_prompt: PromptDefinition,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            llm,
            qa_prompt,
            simplified_prompt,
            settings,
        }
    }

    /// Generate an answer grounded in the retrieved chunks.
    ///
    /// # Errors
    /// `GenerationFailed` carrying both error messages when the first
    /// attempt and the retry fail.
    pub async fn synthesize(
        &self,
        question: &str,
        chunks: &[RetrievedChunk],
        user_context: Option<&UserContext>,
    ) -> AppResult<String> {
        let context = build_context(chunks);
        let enriched = enrich_question(question, user_context);

        let first = match self.generate(&self.qa_prompt, &context, &enriched).await {
            Ok(text) => return Ok(apply_disclaimer(text, question)),
            Err(e) => e,
        };

        tracing::warn!(
            "Answer generation failed, retrying with simplified prompt: {}",
            first
        );

        match self
            .generate(&self.simplified_prompt, &context, question)
            .await
        {
            Ok(text) => {
                tracing::info!("Simplified retry succeeded");
                Ok(apply_disclaimer(text, question))
            }
            Err(retry) => {
                tracing::error!(
                    first_error = %first,
                    retry_error = %retry,
                    "Answer generation failed after retry"
                );
                Err(AppError::GenerationFailed {
                    first: first.to_string(),
                    retry: retry.to_string(),
                })
            }
        }
    }

    async fn generate(
        &self,
        prompt: &PromptDefinition,
        context: &str,
        question: &str,
    ) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("context".to_string(), context.to_string());
        variables.insert("question".to_string(), question.to_string());

        let built = build_prompt(prompt, variables)?;
        tracing::debug!(
            prompt = %built.source_prompt_id,
            chars = built.char_count(),
            "Generating answer"
        );

        let mut request = LlmRequest::new(built.user, &self.settings.model)
            .with_temperature(self.settings.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.llm.complete(&request).await?;
        let text = response.content.trim().to_string();
        if text.is_empty() {
            return Err(AppError::BackendError("Model returned an empty answer".to_string()));
        }

        Ok(text)
    }
}

/// Concatenate chunk texts in retrieval order.
fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::safety::DISCLAIMER;
    use crate::tests::fakes::ScriptedLlm;
    use crate::types::Chunk;
    use cardio_prompt::{builtin_prompt, MEDICAL_QA, MEDICAL_QA_SIMPLIFIED};

    fn synthesizer(llm: Arc<ScriptedLlm>) -> Synthesizer {
        Synthesizer::new(
            llm,
            builtin_prompt(MEDICAL_QA).unwrap(),
            builtin_prompt(MEDICAL_QA_SIMPLIFIED).unwrap(),
            GenerationSettings {
                model: "gpt-3.5-turbo".to_string(),
                temperature: 0.0,
                max_tokens: None,
            },
        )
    }

    fn retrieved(text: &str) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                text: text.to_string(),
                sequence_index: 0,
                overlap_with_previous: 0,
            },
            score: 0.9,
        }
    }

    #[tokio::test]
    async fn test_prompt_carries_context_and_question() {
        let llm = Arc::new(ScriptedLlm::always_ok("L'angine est une douleur."));
        let answer = synthesizer(llm.clone())
            .synthesize(
                "Qu'est-ce que l'angine ?",
                &[retrieved("L'angine de poitrine est une douleur thoracique.")],
                None,
            )
            .await
            .unwrap();

        assert_eq!(answer, "L'angine est une douleur.");
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("L'angine de poitrine est une douleur thoracique."));
        assert!(prompts[0].contains("Question: Qu'est-ce que l'angine ?"));
    }

    #[tokio::test]
    async fn test_patient_context_in_prompt() {
        let llm = Arc::new(ScriptedLlm::always_ok("Réponse"));
        let ctx = UserContext::new(1).with_risk(72.0);
        synthesizer(llm.clone())
            .synthesize("Que faire ?", &[], Some(&ctx))
            .await
            .unwrap();

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("72"));
        assert!(prompt.contains("élevé"));
    }

    #[tokio::test]
    async fn test_retry_uses_simplified_prompt_and_raw_question() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Err("timeout".to_string()),
            Ok("Réponse courte".to_string()),
        ]));
        let ctx = UserContext::new(1).with_risk(72.0);
        let answer = synthesizer(llm.clone())
            .synthesize("Que faire ?", &[retrieved("contexte")], Some(&ctx))
            .await
            .unwrap();

        assert_eq!(answer, "Réponse courte");
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("Version simplifiée: Que faire ?"));
        assert!(!prompts[1].contains("Contexte patient"));
    }

    #[tokio::test]
    async fn test_double_failure_keeps_both_errors() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Err("timeout".to_string()),
            Err("quota".to_string()),
        ]));
        let result = synthesizer(llm).synthesize("Question", &[], None).await;

        match result {
            Err(AppError::GenerationFailed { first, retry }) => {
                assert!(first.contains("timeout"));
                assert!(retry.contains("quota"));
            }
            other => panic!("Expected GenerationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_treatment_question_gets_disclaimer() {
        let llm = Arc::new(ScriptedLlm::always_ok("Des bêtabloquants peuvent être prescrits."));
        let answer = synthesizer(llm)
            .synthesize("Quel médicament pour l'hypertension ?", &[retrieved("x")], None)
            .await
            .unwrap();

        assert!(answer.ends_with(DISCLAIMER));
    }

    #[tokio::test]
    async fn test_empty_completion_triggers_retry() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok("   ".to_string()),
            Ok("Seconde réponse".to_string()),
        ]));
        let answer = synthesizer(llm).synthesize("Question", &[], None).await.unwrap();
        assert_eq!(answer, "Seconde réponse");
    }

    #[test]
    fn test_build_context_joins_in_order() {
        let context = build_context(&[retrieved("un"), retrieved("deux")]);
        assert_eq!(context, "un\n\ndeux");
    }
}
