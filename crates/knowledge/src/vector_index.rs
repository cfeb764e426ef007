//! In-memory vector index over corpus chunks.
//!
//! Entries are kept in chunk order and searched exhaustively by cosine
//! similarity. The index is immutable once built; a reload replaces it.

use crate::embeddings::{embed_in_batches, EmbeddingProvider};
use crate::types::{Chunk, RetrievedChunk};
use cardio_core::{AppError, AppResult};

/// A chunk and its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Assemble an index from existing entries.
    ///
    /// # Errors
    /// `IndexCorrupt` when an embedding does not have `dimensions` values.
    pub fn from_entries(dimensions: usize, entries: Vec<IndexEntry>) -> AppResult<Self> {
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(AppError::IndexCorrupt(format!(
                "Chunk {} has {} dimensions, expected {}",
                bad.chunk.sequence_index,
                bad.embedding.len(),
                dimensions
            )));
        }

        Ok(Self {
            dimensions,
            entries,
        })
    }

    /// Embed every non-blank chunk and build the index.
    pub async fn build(
        chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> AppResult<Self> {
        let total = chunks.len();
        let chunks: Vec<Chunk> = chunks
            .into_iter()
            .filter(|c| !c.text.trim().is_empty())
            .collect();

        if chunks.len() < total {
            tracing::debug!("Skipped {} blank chunks", total - chunks.len());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embed_in_batches(provider, &texts, batch_size).await?;

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();

        Self::from_entries(provider.dimensions(), entries).map_err(|e| match e {
            AppError::IndexCorrupt(msg) => {
                AppError::BackendError(format!("Embedding provider returned bad vectors: {}", msg))
            }
            other => other,
        })
    }

    /// Top-k entries by cosine similarity, best first.
    ///
    /// Ties keep chunk order, so the earlier chunk wins.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<RetrievedChunk>> {
        if query.len() != self.dimensions {
            return Err(AppError::BackendError(format!(
                "Query embedding has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(query, &entry.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| RetrievedChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }

    pub fn documents_count(&self) -> usize {
        self.entries.len()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

/// Cosine similarity between two vectors; 0.0 for zero or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
