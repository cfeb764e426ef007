//! Error types for the cardiac knowledge assistant.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! corpus, backend, generation, index and prompt failures.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the cardiac knowledge assistant.
///
/// All fallible functions return `Result<T, AppError>`. The knowledge
/// engine catches every variant at its boundary and turns it into a
/// degraded answer, so none of these ever reach an end user verbatim.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The knowledge corpus file does not exist
    #[error("Corpus file not found: {0:?}")]
    CorpusMissing(PathBuf),

    /// The knowledge corpus exceeds the configured size ceiling
    #[error("Corpus file is too large ({size} bytes, limit {limit} bytes)")]
    CorpusTooLarge { size: u64, limit: u64 },

    /// No credential is configured for the embedding/generation backend
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Transient failure while calling the embedding/generation backend
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Both synthesis attempts failed
    #[error("Generation failed after retry (first: {first}; retry: {retry})")]
    GenerationFailed { first: String, retry: String },

    /// Persisted vector index is unreadable or inconsistent
    #[error("Index corrupt: {0}")]
    IndexCorrupt(String),

    /// Failure writing or opening the index store
    #[error("Index storage error: {0}")]
    Storage(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_too_large_message() {
        let err = AppError::CorpusTooLarge {
            size: 200,
            limit: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("200"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_generation_failed_keeps_both_attempts() {
        let err = AppError::GenerationFailed {
            first: "timeout".to_string(),
            retry: "503".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("timeout"));
        assert!(msg.contains("503"));
    }
}
