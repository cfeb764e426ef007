//! Cardiac medical knowledge engine.
//!
//! Retrieval-augmented answering over a static medical corpus: the corpus
//! is chunked, embedded and persisted as a SQLite vector index; questions
//! are answered from the top matching chunks, enriched with the caller's
//! risk prediction, and degrade to canned fallback answers when the
//! backends are unavailable.
//!
//! # Example
//! ```no_run
//! use cardio_core::AppConfig;
//! use cardio_knowledge::{KnowledgeEngine, UserContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = KnowledgeEngine::from_app_config(&AppConfig::load()?)?;
//! let context = UserContext::new(1).with_risk(72.0);
//! let answer = engine
//!     .answer("Quels sont les symptômes d'un infarctus ?", Some(&context))
//!     .await;
//! println!("{} ({:?}, {})", answer.text, answer.source, answer.confidence);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod chunker;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod engine;
pub mod rag;
pub mod retriever;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use backend::{BackendConnector, Backends, CredentialConnector};
pub use config::KnowledgeConfig;
pub use engine::KnowledgeEngine;
pub use rag::FallbackTable;
pub use store::{IndexStore, SqliteIndexStore};
pub use types::{Answer, AnswerSource, Chunk, IndexMetadata, IndexStats, UserContext};
