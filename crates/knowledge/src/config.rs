//! Knowledge engine configuration.
//!
//! Loaded from `.cardio/knowledge.yaml`; every field has a default so the
//! file is optional.

use crate::embeddings::EmbeddingConfig;
use cardio_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the persisted index file inside the index directory.
pub const INDEX_FILE_NAME: &str = "index.sqlite";

/// Knowledge engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Corpus file, relative to the workspace unless absolute
    pub corpus_path: PathBuf,

    /// Directory holding the persisted index, relative to the workspace unless absolute
    pub index_dir: PathBuf,

    /// Paragraph separator used by the chunker
    pub separator: String,

    /// Target chunk size in characters
    pub chunk_size: usize,

    /// Characters shared between adjacent chunks
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    pub top_k: usize,

    /// Questions longer than this are truncated
    pub max_question_chars: usize,

    /// Largest corpus the index builder accepts
    pub max_corpus_bytes: u64,

    /// Upper bound on one synthesis call, unbounded when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_timeout_secs: Option<u64>,

    /// Generation settings
    pub llm: GenerationConfig,

    /// Embedding settings
    pub embedding: EmbeddingConfig,
}

/// Settings for the answer-generation model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Chat model, falls back to the application model when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub temperature: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("medical_knowledge.txt"),
            index_dir: PathBuf::from("embeddings/vector_index"),
            separator: "\n\n".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            max_question_chars: 500,
            max_corpus_bytes: 100 * 1024 * 1024,
            generation_timeout_secs: None,
            llm: GenerationConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl KnowledgeConfig {
    /// Path of the configuration file inside a workspace.
    pub fn config_path(workspace: &Path) -> PathBuf {
        workspace.join(".cardio").join("knowledge.yaml")
    }

    /// Load configuration, using defaults when no file exists.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        let config_path = Self::config_path(workspace);

        if !config_path.exists() {
            tracing::debug!("No knowledge config at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        tracing::debug!("Loaded knowledge config from {:?}", config_path);
        Ok(config)
    }

    /// Corpus location resolved against the workspace.
    pub fn resolve_corpus_path(&self, workspace: &Path) -> PathBuf {
        resolve(workspace, &self.corpus_path)
    }

    /// Index directory resolved against the workspace.
    pub fn resolve_index_dir(&self, workspace: &Path) -> PathBuf {
        resolve(workspace, &self.index_dir)
    }

    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        if self.max_question_chars == 0 {
            return Err(AppError::Config(
                "max_question_chars must be at least 1".to_string(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be at least 1".to_string(),
            ));
        }

        crate::chunker::ChunkerConfig::from(self).validate()
    }
}

fn resolve(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let config = KnowledgeConfig::load(temp.path()).unwrap();

        assert_eq!(config, KnowledgeConfig::default());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.max_question_chars, 500);
        assert_eq!(config.max_corpus_bytes, 104_857_600);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".cardio")).unwrap();
        fs::write(
            KnowledgeConfig::config_path(temp.path()),
            "corpus_path: data/corpus.txt\ngeneration_timeout_secs: 30\nembedding:\n  provider: trigram\n  dimensions: 64\n",
        )
        .unwrap();

        let config = KnowledgeConfig::load(temp.path()).unwrap();
        assert_eq!(config.corpus_path, PathBuf::from("data/corpus.txt"));
        assert_eq!(config.generation_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.embedding.batch_size, 100);
        assert_eq!(config.separator, "\n\n");
    }

    #[test]
    fn test_load_roundtrips_serialized_config() {
        let temp = TempDir::new().unwrap();
        let config = KnowledgeConfig {
            top_k: 5,
            ..KnowledgeConfig::default()
        };

        fs::create_dir_all(temp.path().join(".cardio")).unwrap();
        fs::write(
            KnowledgeConfig::config_path(temp.path()),
            serde_yaml::to_string(&config).unwrap(),
        )
        .unwrap();
        assert_eq!(KnowledgeConfig::load(temp.path()).unwrap(), config);
    }

    #[test]
    fn test_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".cardio")).unwrap();
        fs::write(KnowledgeConfig::config_path(temp.path()), "top_k: [").unwrap();

        assert!(matches!(
            KnowledgeConfig::load(temp.path()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_path_resolution() {
        let workspace = Path::new("/srv/cardio");
        let config = KnowledgeConfig::default();

        assert_eq!(
            config.resolve_corpus_path(workspace),
            PathBuf::from("/srv/cardio/medical_knowledge.txt")
        );
        assert_eq!(
            config.resolve_index_dir(workspace),
            PathBuf::from("/srv/cardio/embeddings/vector_index")
        );
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_size() {
        let config = KnowledgeConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..KnowledgeConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(KnowledgeConfig::default().validate().is_ok());
    }
}
