//! Core types for the cardiac knowledge engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contiguous segment of the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text
    pub text: String,

    /// Position of the chunk in the corpus (0-based)
    pub sequence_index: usize,

    /// Number of leading characters shared with the previous chunk
    pub overlap_with_previous: usize,
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,

    /// Cosine similarity with the query vector
    pub score: f32,
}

/// Caller-supplied patient signal. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// Output of the risk classifier: 1 = high risk, 0 = low risk
    #[serde(default)]
    pub prediction: Option<u8>,

    /// Estimated risk in percent
    #[serde(default)]
    pub risk_percentage: Option<f64>,
}

impl UserContext {
    pub fn new(prediction: u8) -> Self {
        Self {
            prediction: Some(prediction),
            risk_percentage: None,
        }
    }

    pub fn with_risk(mut self, risk_percentage: f64) -> Self {
        self.risk_percentage = Some(risk_percentage);
        self
    }
}

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    KnowledgeBase,
    Fallback,
    Error,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::KnowledgeBase => "knowledge_base",
            AnswerSource::Fallback => "fallback",
            AnswerSource::Error => "error",
        }
    }
}

/// Answer returned to callers.
///
/// Serializes as `{"response": ..., "source": ..., "confidence": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "response")]
    pub text: String,

    pub source: AnswerSource,

    pub confidence: f32,
}

impl Answer {
    pub fn new(text: impl Into<String>, source: AnswerSource, confidence: f32) -> Self {
        Self {
            text: text.into(),
            source,
            confidence,
        }
    }
}

/// Metadata persisted next to the index entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separator: String,

    /// SHA-256 of the corpus the index was built from (hex)
    pub corpus_sha256: String,

    pub documents_count: usize,
    pub built_at: DateTime<Utc>,
}

/// Summary of a persisted index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub metadata: IndexMetadata,

    /// Size of the index file on disk
    pub db_size_bytes: u64,
}
