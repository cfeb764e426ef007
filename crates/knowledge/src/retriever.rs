//! Top-k retrieval over the vector index.

use crate::embeddings::EmbeddingProvider;
use crate::types::RetrievedChunk;
use crate::vector_index::VectorIndex;
use cardio_core::AppResult;
use std::sync::Arc;

/// Number of chunks retrieved per question by default.
pub const DEFAULT_TOP_K: usize = 3;

/// Embeds questions and searches the index. Holds no per-query state.
#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k: top_k.max(1),
        }
    }

    /// Retrieve the most similar chunks, best first.
    pub async fn retrieve(&self, query: &str) -> AppResult<Vec<RetrievedChunk>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self.index.search(&query_embedding, self.top_k)?;

        if let Some(top) = results.first() {
            tracing::debug!(
                "Retrieved {} chunks (top score: {:.3})",
                results.len(),
                top.score
            );
        } else {
            tracing::debug!("Retrieved no chunks");
        }

        Ok(results)
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::types::Chunk;

    async fn build(texts: &[&str]) -> (Arc<VectorIndex>, Arc<dyn EmbeddingProvider>) {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(256));
        let chunks = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk {
                text: t.to_string(),
                sequence_index: i,
                overlap_with_previous: 0,
            })
            .collect();
        let index = VectorIndex::build(chunks, provider.as_ref(), 10).await.unwrap();
        (Arc::new(index), provider)
    }

    #[tokio::test]
    async fn test_retrieve_returns_at_most_k() {
        let (index, provider) = build(&[
            "L'hypertension artérielle est une pression sanguine élevée.",
            "L'arythmie est un trouble du rythme cardiaque.",
            "Le cholestérol se dépose dans les artères.",
            "L'insuffisance cardiaque réduit le débit sanguin.",
        ])
        .await;

        let retriever = Retriever::new(index, provider, DEFAULT_TOP_K);
        let results = retriever.retrieve("hypertension artérielle").await.unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].chunk.text.contains("hypertension"));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_retrieve_from_empty_index() {
        let (index, provider) = build(&[]).await;
        let retriever = Retriever::new(index, provider, 3);

        assert!(retriever.retrieve("cœur").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_k_is_clamped() {
        let (index, provider) = build(&["un", "deux"]).await;
        assert_eq!(Retriever::new(index, provider, 0).top_k(), 1);
    }
}
