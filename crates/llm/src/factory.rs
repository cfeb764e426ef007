//! LLM provider factory.
//!
//! Creates LLM clients from a provider name, optional endpoint and the
//! resolved credential.

use crate::client::LlmClient;
use crate::providers::openai::{OpenAiClient, DEFAULT_OPENAI_URL};
use cardio_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Errors
/// - `BackendUnavailable` when the provider needs a key and none is given
/// - `Config` when the provider is unknown
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "openai" => {
            let key = api_key.ok_or_else(|| {
                AppError::BackendUnavailable("OpenAI provider requires an API key".to_string())
            })?;
            let base_url = endpoint.unwrap_or(DEFAULT_OPENAI_URL);
            Ok(Arc::new(OpenAiClient::with_base_url(base_url, key)?))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_openai_client() {
        let client = create_client("openai", None, Some("sk-test")).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_create_openai_with_custom_endpoint() {
        let client = create_client("OpenAI", Some("http://localhost:8080/v1"), Some("sk-test"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None) {
            Err(AppError::BackendUnavailable(msg)) => assert!(msg.contains("API key")),
            Err(other) => panic!("Unexpected error: {}", other),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, Some("sk-test")) {
            Err(AppError::Config(msg)) => assert!(msg.contains("Unknown provider")),
            Err(other) => panic!("Unexpected error: {}", other),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
