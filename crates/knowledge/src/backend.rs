//! Connection to the embedding and generation backends.

use crate::config::KnowledgeConfig;
use crate::embeddings::{create_provider, EmbeddingProvider};
use cardio_core::{AppConfig, AppError, AppResult};
use cardio_llm::{create_client, LlmClient};
use std::sync::Arc;

/// Live handles to the remote backends.
#[derive(Clone)]
pub struct Backends {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmClient>,

    /// Chat model to use when the knowledge config names none
    pub model: String,
}

/// Produces backend handles for the knowledge engine.
#[async_trait::async_trait]
pub trait BackendConnector: Send + Sync {
    /// Check credentials and create clients.
    ///
    /// # Errors
    /// `BackendUnavailable` when no credential is configured.
    async fn connect(&self) -> AppResult<Backends>;
}

/// Connector that resolves the API key from the application config.
pub struct CredentialConnector {
    app: AppConfig,
    knowledge: KnowledgeConfig,
}

impl CredentialConnector {
    pub fn new(app: AppConfig, knowledge: KnowledgeConfig) -> Self {
        Self { app, knowledge }
    }
}

#[async_trait::async_trait]
impl BackendConnector for CredentialConnector {
    async fn connect(&self) -> AppResult<Backends> {
        let provider = self.app.provider.as_str();
        let api_key = self.app.resolve_api_key(provider);

        if api_key.is_none() {
            return Err(AppError::BackendUnavailable(format!(
                "No API key found (set {} or CARDIO_API_KEY)",
                self.app.api_key_env(provider)
            )));
        }

        let mut embedding = self.knowledge.embedding.clone();
        if embedding.endpoint.is_none() {
            embedding.endpoint = self.app.endpoint(&embedding.provider);
        }
        if let Some(model) = self.app.embedding_model(&embedding.provider) {
            embedding.model = model;
        }

        let embedder = create_provider(&embedding, api_key.as_deref())?;
        let llm = create_client(
            provider,
            self.app.endpoint(provider).as_deref(),
            api_key.as_deref(),
        )?;

        tracing::debug!(
            "Connected backends: llm={}, embeddings={} ({})",
            llm.provider_name(),
            embedder.provider_name(),
            embedder.model_name()
        );

        Ok(Backends {
            embedder,
            llm,
            model: self.app.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn app_config(api_key: Option<&str>) -> AppConfig {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            cardio_core::config::ProviderConfig {
                api_key_env: "CARDIO_TEST_UNSET_KEY_VAR".to_string(),
                model: "gpt-4o-mini".to_string(),
                embedding_model: Some("text-embedding-3-small".to_string()),
                endpoint: None,
            },
        );

        AppConfig {
            workspace: PathBuf::from("."),
            api_key: api_key.map(str::to_string),
            model: "gpt-4o-mini".to_string(),
            llm: Some(cardio_core::config::LlmConfig {
                active_provider: "openai".to_string(),
                providers,
            }),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_credential_is_unavailable() {
        let connector = CredentialConnector::new(app_config(None), KnowledgeConfig::default());
        assert!(matches!(
            connector.connect().await,
            Err(AppError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_with_credential() {
        let connector =
            CredentialConnector::new(app_config(Some("sk-test")), KnowledgeConfig::default());
        let backends = connector.connect().await.unwrap();

        assert_eq!(backends.llm.provider_name(), "openai");
        assert_eq!(backends.embedder.model_name(), "text-embedding-3-small");
        assert_eq!(backends.model, "gpt-4o-mini");
    }
}
