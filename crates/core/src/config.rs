//! Configuration management for the cardiac knowledge assistant.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.cardio/config.yaml)
//!
//! The configuration is workspace-centric, with most state stored in `.cardio/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Environment variable holding the backend credential by default.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Providers the assistant knows how to talk to.
pub const KNOWN_PROVIDERS: [&str; 1] = ["openai"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .cardio/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider (e.g., "openai")
    pub provider: String,

    /// Default chat model identifier
    pub model: String,

    /// Explicit API key (from CARDIO_API_KEY)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv", default = "default_api_key_env")]
    pub api_key_env: String,

    /// Chat model
    pub model: String,

    /// Embedding model
    #[serde(rename = "embeddingModel", default)]
    pub embedding_model: Option<String>,

    /// Custom endpoint (OpenAI-compatible servers)
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `CARDIO_WORKSPACE`: Override workspace path
    /// - `CARDIO_CONFIG`: Path to config file
    /// - `CARDIO_PROVIDER`: LLM provider
    /// - `CARDIO_MODEL`: Chat model identifier
    /// - `CARDIO_API_KEY`: API key (takes precedence over the provider's key variable)
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("CARDIO_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("CARDIO_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.cardio_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("CARDIO_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("CARDIO_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("CARDIO_API_KEY").ok();
        if config.log_level.is_none() {
            config.log_level = std::env::var("RUST_LOG").ok();
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model.clone();
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and YAML.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .cardio directory.
    pub fn cardio_dir(&self) -> PathBuf {
        self.workspace.join(".cardio")
    }

    /// Ensure the .cardio directory exists.
    pub fn ensure_cardio_dir(&self) -> AppResult<()> {
        let dir = self.cardio_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .cardio directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get the configuration of a provider, if declared in config.yaml.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Name of the environment variable that holds the provider's API key.
    pub fn api_key_env(&self, provider: &str) -> String {
        self.get_provider_config(provider)
            .map(|p| p.api_key_env.clone())
            .unwrap_or_else(default_api_key_env)
    }

    /// Custom endpoint for a provider, if any.
    pub fn endpoint(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|p| p.endpoint.clone())
    }

    /// Embedding model declared for a provider, if any.
    pub fn embedding_model(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|p| p.embedding_model.clone())
    }

    /// Resolve the API key for a provider.
    ///
    /// `CARDIO_API_KEY` wins; otherwise the provider's `apiKeyEnv` variable
    /// (default `OPENAI_API_KEY`) is read. Empty values count as missing.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }

        std::env::var(self.api_key_env(provider))
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Validate configuration for the active provider.
    ///
    /// A missing API key is deliberately not an error here: the knowledge
    /// engine degrades to its fallback answers without one.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if let Some(llm) = &self.llm {
            if !llm.providers.is_empty() && !llm.providers.contains_key(&llm.active_provider) {
                return Err(AppError::Config(format!(
                    "Active provider '{}' has no entry under llm.providers",
                    llm.active_provider
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_cardio_dir() {
        let config = AppConfig::default();
        assert!(config.cardio_dir().ends_with(".cardio"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("openai".to_string()),
            Some("gpt-4".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "openai");
        assert_eq!(overridden.model, "gpt-4");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let config = AppConfig {
            provider: "unknown".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_default_provider() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: openai
  providers:
    openai:
      apiKeyEnv: CARDIO_TEST_KEY_UNSET
      model: gpt-4o-mini
      embeddingModel: text-embedding-3-small
      endpoint: http://localhost:8080/v1
logging:
  level: debug
  color: false
"#,
        )
        .unwrap();

        let config = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(config.no_color);
        assert_eq!(config.api_key_env("openai"), "CARDIO_TEST_KEY_UNSET");
        assert_eq!(
            config.endpoint("openai").as_deref(),
            Some("http://localhost:8080/v1")
        );
        assert_eq!(
            config.embedding_model("openai").as_deref(),
            Some("text-embedding-3-small")
        );
    }

    #[test]
    fn test_resolve_api_key_prefers_explicit_key() {
        let config = AppConfig {
            api_key: Some("sk-explicit".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(
            config.resolve_api_key("openai").as_deref(),
            Some("sk-explicit")
        );
    }

    #[test]
    fn test_resolve_api_key_ignores_blank_key() {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderConfig {
                api_key_env: "CARDIO_TEST_KEY_NEVER_SET".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                embedding_model: None,
                endpoint: None,
            },
        );
        let config = AppConfig {
            api_key: Some("   ".to_string()),
            llm: Some(LlmConfig {
                active_provider: "openai".to_string(),
                providers,
            }),
            ..AppConfig::default()
        };
        assert!(config.resolve_api_key("openai").is_none());
    }
}
