//! Index command handler.
//!
//! Builds the persisted vector index and reports its metadata.

use cardio_core::{config::AppConfig, AppError, AppResult};
use cardio_knowledge::{KnowledgeConfig, KnowledgeEngine, SqliteIndexStore};
use clap::{Args, Subcommand};
use std::time::Instant;

/// Vector index management
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Build the index from the corpus, or load it if already built
    Build(IndexBuildCommand),
    /// Show persisted index metadata
    Stats(IndexStatsCommand),
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Build(cmd) => cmd.execute(config).await,
            IndexAction::Stats(cmd) => cmd.execute(config),
        }
    }
}

/// Build the index
#[derive(Args, Debug)]
pub struct IndexBuildCommand {
    /// Rebuild from the corpus even if an index exists
    #[arg(long)]
    pub force: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexBuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index build command (force: {})", self.force);

        let start = Instant::now();
        let engine = KnowledgeEngine::from_app_config(config)?;

        if !engine.initialize(self.force).await {
            return Err(AppError::Storage(
                "Index build failed; run with --verbose for details".to_string(),
            ));
        }

        let chunks = engine.documents_count().await.unwrap_or(0);
        let index_dir = engine.config().resolve_index_dir(&config.workspace);
        let duration = start.elapsed().as_secs_f64();
        engine.cleanup().await;

        if self.json {
            let output = serde_json::json!({
                "indexDir": index_dir,
                "chunksCount": chunks,
                "durationSecs": duration,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Index ready: {} chunks in {:?} ({:.2}s)",
                chunks, index_dir, duration
            );
        }

        Ok(())
    }
}

/// Show index statistics
#[derive(Args, Debug)]
pub struct IndexStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index stats command");

        let knowledge = KnowledgeConfig::load(&config.workspace)?;
        let index_dir = knowledge.resolve_index_dir(&config.workspace);
        let store = SqliteIndexStore::new(&index_dir);

        let Some(stats) = store.read_stats()? else {
            println!(
                "No index found in {:?}. Run 'cardio index build' first.",
                index_dir
            );
            return Ok(());
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            let meta = &stats.metadata;
            println!("Index: {:?}", store.db_path());
            println!("  Chunks:     {}", meta.documents_count);
            println!(
                "  Embeddings: {}/{} ({} dims)",
                meta.provider, meta.model, meta.dimensions
            );
            println!(
                "  Chunking:   {} chars, {} overlap",
                meta.chunk_size, meta.chunk_overlap
            );
            println!("  Corpus:     sha256 {}", meta.corpus_sha256);
            println!("  Built at:   {}", meta.built_at.to_rfc3339());
            println!("  Size:       {} bytes", stats.db_size_bytes);
        }

        Ok(())
    }
}
