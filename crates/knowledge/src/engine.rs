//! The knowledge engine: lifecycle, answering and graceful degradation.
//!
//! The engine owns an optional ready pipeline (index, retriever and
//! synthesizer). Initialization is single flight: concurrent callers wait
//! on one build and reuse its result. Answers snapshot the pipeline and run
//! without holding any lock, and a reload swaps in a new pipeline only once
//! it is fully built.

use crate::backend::{BackendConnector, CredentialConnector};
use crate::chunker::{self, ChunkerConfig};
use crate::config::KnowledgeConfig;
use crate::corpus::{read_corpus, Corpus};
use crate::embeddings::EmbeddingProvider;
use crate::rag::fallback::{FallbackTable, FALLBACK_NOTICE, GENERIC_APOLOGY, SERVICE_UNAVAILABLE};
use crate::rag::safety::{apply_disclaimer, enrich_question};
use crate::rag::{GenerationSettings, Synthesizer};
use crate::retriever::Retriever;
use crate::store::{IndexStore, SqliteIndexStore};
use crate::types::{Answer, AnswerSource, IndexMetadata, UserContext};
use crate::vector_index::VectorIndex;
use cardio_core::{AppConfig, AppError, AppResult};
use cardio_prompt::{load_prompt, MEDICAL_QA, MEDICAL_QA_SIMPLIFIED};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

/// Confidence of a grounded answer backed by at least one chunk.
pub const CONFIDENCE_GROUNDED: f32 = 0.85;

/// Confidence of a generated answer with no supporting chunk.
pub const CONFIDENCE_UNGROUNDED: f32 = 0.3;

/// Confidence of a canned fallback answer.
pub const CONFIDENCE_FALLBACK: f32 = 0.5;

/// Everything needed to answer a question.
struct Pipeline {
    retriever: Retriever,
    synthesizer: Synthesizer,
}

impl Pipeline {
    fn documents_count(&self) -> usize {
        self.retriever.index().documents_count()
    }
}

pub struct KnowledgeEngine {
    workspace: PathBuf,
    config: KnowledgeConfig,
    connector: Arc<dyn BackendConnector>,
    store: Arc<dyn IndexStore>,
    fallback: FallbackTable,
    pipeline: RwLock<Option<Arc<Pipeline>>>,
    init_lock: Mutex<()>,

    /// Completed build attempts; only advanced while holding `init_lock`.
    attempts: AtomicU64,
}

impl KnowledgeEngine {
    pub fn new(
        workspace: impl Into<PathBuf>,
        config: KnowledgeConfig,
        connector: Arc<dyn BackendConnector>,
        store: Arc<dyn IndexStore>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            config,
            connector,
            store,
            fallback: FallbackTable::default(),
            pipeline: RwLock::new(None),
            init_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    /// Engine wired to the real backends and the SQLite index store.
    pub fn from_app_config(app: &AppConfig) -> AppResult<Self> {
        let config = KnowledgeConfig::load(&app.workspace)?;
        let store = SqliteIndexStore::new(config.resolve_index_dir(&app.workspace));
        let connector = CredentialConnector::new(app.clone(), config.clone());

        Ok(Self::new(
            app.workspace.clone(),
            config,
            Arc::new(connector),
            Arc::new(store),
        ))
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    /// Prepare the engine for answering.
    ///
    /// A no-op returning `true` when already initialized, unless
    /// `force_reload` is set, in which case the index is rebuilt from the
    /// corpus. Failures are logged and reported as `false`; a failed reload
    /// keeps the previous pipeline. Without `force_reload`, callers that
    /// waited on an attempt already in progress share its outcome.
    pub async fn initialize(&self, force_reload: bool) -> bool {
        let seen = self.attempts.load(Ordering::Acquire);
        self.initialize_after(seen, force_reload).await
    }

    async fn initialize_after(&self, seen: u64, force_reload: bool) -> bool {
        let _guard = self.init_lock.lock().await;

        if !force_reload {
            if self.pipeline.read().await.is_some() {
                return true;
            }
            if self.attempts.load(Ordering::Acquire) != seen {
                tracing::debug!("Reusing the outcome of a concurrent initialization");
                return false;
            }
        }

        let start = Instant::now();
        let result = self.build_pipeline(force_reload).await;
        self.attempts.fetch_add(1, Ordering::Release);

        match result {
            Ok(pipeline) => {
                tracing::info!(
                    "Knowledge engine ready with {} chunks in {:.2}s",
                    pipeline.documents_count(),
                    start.elapsed().as_secs_f64()
                );
                *self.pipeline.write().await = Some(Arc::new(pipeline));
                true
            }
            Err(e) => {
                tracing::error!("Knowledge engine initialization failed: {}", e);
                false
            }
        }
    }

    /// Answer a question. Never fails: errors become degraded answers.
    pub async fn answer(&self, question: &str, user_context: Option<&UserContext>) -> Answer {
        let Some(pipeline) = self.ready_pipeline().await else {
            return self.unavailable_answer(question);
        };

        let question = self.truncate_question(question);

        let result = match self.config.generation_timeout() {
            Some(limit) => {
                match tokio::time::timeout(limit, run(&pipeline, &question, user_context)).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::BackendError(format!(
                        "Answer generation timed out after {}s",
                        limit.as_secs()
                    ))),
                }
            }
            None => run(&pipeline, &question, user_context).await,
        };

        match result {
            Ok((text, retrieved)) => {
                let confidence = if retrieved > 0 {
                    CONFIDENCE_GROUNDED
                } else {
                    CONFIDENCE_UNGROUNDED
                };
                Answer::new(text, AnswerSource::KnowledgeBase, confidence)
            }
            Err(e) => {
                tracing::error!("Failed to answer from the knowledge base: {}", e);
                self.fallback_answer(&question)
                    .unwrap_or_else(|| self.degraded(GENERIC_APOLOGY, &question))
            }
        }
    }

    /// Answer text only, for adapters that ignore source and confidence.
    pub async fn answer_text(&self, question: &str, user_context: Option<&UserContext>) -> String {
        self.answer(question, user_context).await.text
    }

    /// Drop the pipeline. Safe to call repeatedly.
    pub async fn cleanup(&self) {
        let _guard = self.init_lock.lock().await;
        if self.pipeline.write().await.take().is_some() {
            tracing::info!("Knowledge engine resources released");
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.pipeline.read().await.is_some()
    }

    /// Number of indexed chunks, if initialized.
    pub async fn documents_count(&self) -> Option<usize> {
        self.pipeline
            .read()
            .await
            .as_ref()
            .map(|p| p.documents_count())
    }

    async fn ready_pipeline(&self) -> Option<Arc<Pipeline>> {
        let seen = self.attempts.load(Ordering::Acquire);
        if let Some(pipeline) = self.pipeline.read().await.clone() {
            return Some(pipeline);
        }

        if self.initialize_after(seen, false).await {
            self.pipeline.read().await.clone()
        } else {
            None
        }
    }

    fn truncate_question(&self, question: &str) -> String {
        let max = self.config.max_question_chars;
        let length = question.chars().count();
        if length <= max {
            return question.to_string();
        }

        tracing::warn!(
            original_chars = length,
            max_chars = max,
            "Question truncated to {} characters",
            max
        );
        question.chars().take(max).collect()
    }

    fn unavailable_answer(&self, question: &str) -> Answer {
        let question = self.truncate_question(question);
        self.fallback_answer(&question)
            .unwrap_or_else(|| self.degraded(SERVICE_UNAVAILABLE, &question))
    }

    fn fallback_answer(&self, question: &str) -> Option<Answer> {
        let canned = self.fallback.lookup(question)?;
        tracing::info!("Serving fallback answer");

        let text = apply_disclaimer(format!("{}{}", canned, FALLBACK_NOTICE), question);
        Some(Answer::new(text, AnswerSource::Fallback, CONFIDENCE_FALLBACK))
    }

    fn degraded(&self, message: &str, question: &str) -> Answer {
        Answer::new(
            apply_disclaimer(message.to_string(), question),
            AnswerSource::Error,
            0.0,
        )
    }

    async fn build_pipeline(&self, force_reload: bool) -> AppResult<Pipeline> {
        self.config.validate()?;

        let backends = self.connector.connect().await?;
        let index = self
            .prepare_index(backends.embedder.as_ref(), force_reload)
            .await?;

        let qa_prompt = load_prompt(&self.workspace, MEDICAL_QA)?;
        let simplified_prompt = load_prompt(&self.workspace, MEDICAL_QA_SIMPLIFIED)?;
        let settings = GenerationSettings {
            model: self.config.llm.model.clone().unwrap_or(backends.model),
            temperature: self.config.llm.temperature,
            max_tokens: self.config.llm.max_tokens,
        };

        Ok(Pipeline {
            retriever: Retriever::new(index, backends.embedder, self.config.top_k),
            synthesizer: Synthesizer::new(backends.llm, qa_prompt, simplified_prompt, settings),
        })
    }

    /// Load the persisted index, or build a fresh one from the corpus.
    async fn prepare_index(
        &self,
        embedder: &dyn EmbeddingProvider,
        force_reload: bool,
    ) -> AppResult<Arc<VectorIndex>> {
        if !force_reload && self.store.exists().await {
            match self.store.load().await {
                Ok((index, metadata)) => match self.stale_reason(&metadata, embedder).await {
                    None => {
                        tracing::info!(
                            "Loaded persisted index ({} chunks)",
                            index.documents_count()
                        );
                        return Ok(Arc::new(index));
                    }
                    Some(reason) => tracing::info!("Rebuilding index: {}", reason),
                },
                Err(e) => tracing::warn!("Persisted index unusable, rebuilding: {}", e),
            }
        }

        let corpus = self.read_corpus().await?;
        self.build_index(corpus, embedder).await
    }

    async fn build_index(
        &self,
        corpus: Corpus,
        embedder: &dyn EmbeddingProvider,
    ) -> AppResult<Arc<VectorIndex>> {
        tracing::info!("Building index from {:?}", corpus.path);

        let chunks = chunker::split(&corpus.text, &ChunkerConfig::from(&self.config))?;
        let index = Arc::new(
            VectorIndex::build(chunks, embedder, self.config.embedding.batch_size).await?,
        );

        let metadata = IndexMetadata {
            provider: embedder.provider_name().to_string(),
            model: embedder.model_name().to_string(),
            dimensions: index.dimensions(),
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            separator: self.config.separator.clone(),
            corpus_sha256: corpus.sha256,
            documents_count: index.documents_count(),
            built_at: Utc::now(),
        };

        if let Err(e) = self.store.persist(Arc::clone(&index), metadata).await {
            tracing::error!("Failed to persist index, serving it from memory: {}", e);
        }

        Ok(index)
    }

    async fn read_corpus(&self) -> AppResult<Corpus> {
        let path = self.config.resolve_corpus_path(&self.workspace);
        let max_bytes = self.config.max_corpus_bytes;
        tokio::task::spawn_blocking(move || read_corpus(&path, max_bytes))
            .await
            .map_err(|e| AppError::Storage(format!("Corpus read task failed: {}", e)))?
    }

    /// Why a persisted index no longer matches the configuration or corpus.
    async fn stale_reason(
        &self,
        metadata: &IndexMetadata,
        embedder: &dyn EmbeddingProvider,
    ) -> Option<String> {
        if metadata.provider != embedder.provider_name() || metadata.model != embedder.model_name()
        {
            return Some(format!(
                "embedding model changed ({}/{} -> {}/{})",
                metadata.provider,
                metadata.model,
                embedder.provider_name(),
                embedder.model_name()
            ));
        }

        if metadata.dimensions != embedder.dimensions() {
            return Some("embedding dimensions changed".to_string());
        }

        if metadata.chunk_size != self.config.chunk_size
            || metadata.chunk_overlap != self.config.chunk_overlap
            || metadata.separator != self.config.separator
        {
            return Some("chunking parameters changed".to_string());
        }

        // An unreadable corpus does not invalidate an existing index.
        match self.read_corpus().await {
            Ok(corpus) if corpus.sha256 != metadata.corpus_sha256 => {
                Some("corpus content changed".to_string())
            }
            _ => None,
        }
    }
}

/// Retrieve and synthesize; returns the text and the number of chunks used.
async fn run(
    pipeline: &Pipeline,
    question: &str,
    user_context: Option<&UserContext>,
) -> AppResult<(String, usize)> {
    let query = enrich_question(question, user_context);
    let retrieved = pipeline.retriever.retrieve(&query).await?;
    let text = pipeline
        .synthesizer
        .synthesize(question, &retrieved, user_context)
        .await?;
    Ok((text, retrieved.len()))
}
