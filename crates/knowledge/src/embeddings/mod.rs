//! Embedding generation for the corpus index.
//!
//! Provides provider-agnostic embedding behind [`EmbeddingProvider`] plus a
//! batching helper used when building the index.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use cardio_core::{AppError, AppResult};
use futures::stream::{self, StreamExt, TryStreamExt};

/// Number of embedding requests kept in flight while building.
const MAX_CONCURRENT_BATCHES: usize = 4;

/// Embed texts in batches of `batch_size`, preserving input order.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = batch_size.max(1);
    let batches = texts.chunks(batch_size).count();

    tracing::info!(
        "Embedding {} texts in {} batches using provider '{}' (model: {})",
        texts.len(),
        batches,
        provider.provider_name(),
        provider.model_name()
    );

    let results: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(batch_size))
        .map(|batch| provider.embed_batch(batch))
        .buffered(MAX_CONCURRENT_BATCHES)
        .try_collect()
        .await?;

    let embeddings: Vec<Vec<f32>> = results.into_iter().flatten().collect();
    if embeddings.len() != texts.len() {
        return Err(AppError::BackendError(format!(
            "Expected {} embeddings, got {}",
            texts.len(),
            embeddings.len()
        )));
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        embeddings.len(),
        provider.dimensions()
    );

    Ok(embeddings)
}
