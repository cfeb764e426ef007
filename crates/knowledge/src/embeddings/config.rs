//! Embedding configuration.

use serde::{Deserialize, Serialize};

/// Embedding settings for the corpus index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "openai" or "trigram"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Maximum number of texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Custom OpenAI-compatible endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }
}

impl EmbeddingConfig {
    /// Offline configuration backed by the trigram provider.
    pub fn trigram(dimensions: usize) -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions,
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }

    /// Whether the provider needs a credential.
    pub fn requires_api_key(&self) -> bool {
        self.provider != "trigram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: EmbeddingConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, EmbeddingConfig::default());
        assert!(config.requires_api_key());
    }

    #[test]
    fn test_trigram_needs_no_key() {
        let config = EmbeddingConfig::trigram(64);
        assert_eq!(config.dimensions, 64);
        assert!(!config.requires_api_key());
    }
}
