//! Process-wide service state.
//!
//! [`ServiceContext`] owns the embedder, the corpus index, the matcher, the
//! worker lookup and the quick-fix generator. It is built once at startup and
//! shared behind an `Arc` by the HTTP handlers and the CLI.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::advisory::{build_quick_fix, QuickFixGenerator};
use crate::config::{DirectoryBackend, EmbeddingBackend, ServiceConfig};
use crate::directory::{
    DirectoryResult, FallbackTable, InMemoryDirectory, RocksDirectory, SeedReport, Worker,
    WorkerDirectory, WorkerLookup,
};
use crate::error::Result;
use crate::search::{
    Embedder, EmbeddingService, EmbeddingServiceConfig, HashingEmbedder, MatchResult, Matcher,
    MatcherConfig, TaxonomyIndex,
};

/// Answer to one analyzed problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub detected_category: String,
    pub available_workers: Vec<Worker>,
    pub quick_fix: String,
}

/// Shared state of a running service.
pub struct ServiceContext {
    config: ServiceConfig,
    embedder: Arc<dyn Embedder>,
    matcher: Arc<Matcher>,
    workers: Arc<WorkerLookup>,
    quick_fix: Arc<dyn QuickFixGenerator>,
    started_at: Instant,
}

impl ServiceContext {
    /// Build everything from configuration.
    ///
    /// Blocking: loads (and possibly downloads) the embedding model, encodes
    /// the whole corpus and opens the directory. Any failure is fatal.
    pub fn initialize(config: ServiceConfig) -> Result<Self> {
        config.validate()?;

        let embedder = build_embedder(&config)?;
        info!(
            "Using {} embedder ({}d)",
            embedder.model_name(),
            embedder.dimension()
        );

        info!("Loading corpus from {}", config.corpus.path.display());
        let index = TaxonomyIndex::load(&config.corpus.path, embedder.as_ref())?;
        info!(
            "Corpus ready: {} entries across {} categories",
            index.len(),
            index.categories().len()
        );

        let directory: Arc<dyn WorkerDirectory> = match config.directory.backend {
            DirectoryBackend::Memory => Arc::new(InMemoryDirectory::new()),
            DirectoryBackend::Rocksdb => Arc::new(RocksDirectory::open(&config.directory.path)?),
        };

        let quick_fix = build_quick_fix(&config.quick_fix)?;
        info!("Quick-fix strategy: {}", quick_fix.strategy());

        Self::from_parts(config, embedder, Arc::new(index), directory, quick_fix)
    }

    /// Assemble a context from prebuilt parts.
    pub fn from_parts(
        config: ServiceConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<TaxonomyIndex>,
        directory: Arc<dyn WorkerDirectory>,
        quick_fix: Arc<dyn QuickFixGenerator>,
    ) -> Result<Self> {
        let matcher = Matcher::new(
            index,
            Arc::clone(&embedder),
            MatcherConfig::from(&config.matcher),
        )?;
        let workers = WorkerLookup::new(directory, FallbackTable::default())
            .with_timeout(Duration::from_millis(config.directory.lookup_timeout_ms));

        Ok(Self {
            config,
            embedder,
            matcher: Arc::new(matcher),
            workers: Arc::new(workers),
            quick_fix,
            started_at: Instant::now(),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn matcher(&self) -> &Arc<Matcher> {
        &self.matcher
    }

    pub fn workers(&self) -> &Arc<WorkerLookup> {
        &self.workers
    }

    pub fn quick_fix(&self) -> &Arc<dyn QuickFixGenerator> {
        &self.quick_fix
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Classify a problem on a blocking thread. Matching errors degrade to
    /// the fallback category.
    pub async fn classify(&self, problem: &str) -> MatchResult {
        let matcher = Arc::clone(&self.matcher);
        let query = problem.to_string();
        let started = Instant::now();

        let result = match tokio::task::spawn_blocking(move || matcher.match_query(&query)).await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!("Matching failed, using fallback category: {}", e);
                self.matcher.fallback()
            }
            Err(e) => {
                warn!("Matching task failed, using fallback category: {}", e);
                self.matcher.fallback()
            }
        };

        metrics::histogram!("homefix_match_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    /// Full analysis: category, workers and advisory.
    pub async fn analyze(&self, problem: &str) -> Analysis {
        let result = self.classify(problem).await;
        metrics::counter!(
            "homefix_analyze_requests_total",
            "category" => result.category.clone(),
            "matched" => if result.matched { "true" } else { "false" }
        )
        .increment(1);

        let available_workers = self.workers.list_by_category(&result.category).await;
        let quick_fix = self.quick_fix.generate(problem, &result.category).await;

        Analysis {
            detected_category: result.category,
            available_workers,
            quick_fix,
        }
    }

    /// Seed the live directory from the fallback table.
    pub async fn seed(&self) -> DirectoryResult<SeedReport> {
        self.workers.seed().await
    }

    /// Flush the directory before exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.workers.directory().flush().await?;
        info!("Service context shut down");
        Ok(())
    }
}

fn build_embedder(config: &ServiceConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.embedding.backend {
        EmbeddingBackend::Fastembed => {
            info!(
                "Initializing embedding model {} (downloaded on first use)",
                config.embedding.model
            );
            Arc::new(EmbeddingService::with_config(EmbeddingServiceConfig {
                model: config.embedding.model.clone(),
                cache_dir: config.embedding.cache_dir.clone(),
                show_download_progress: config.embedding.show_download_progress,
                query_cache_capacity: config.embedding.query_cache_capacity,
            })?)
        }
        EmbeddingBackend::Hashing => {
            Arc::new(HashingEmbedder::new(config.embedding.hashing_dimension))
        }
    };
    Ok(embedder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::ConstantQuickFix;
    use crate::config::DEFAULT_ADVISORY;
    use crate::search::CorpusRow;

    fn context() -> ServiceContext {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::default());
        let rows = vec![
            CorpusRow::new("leaking pipe", "plumber"),
            CorpusRow::new("power outage in the house", "electrician"),
            CorpusRow::new("door lock is jammed", "locksmith"),
        ];
        let index = TaxonomyIndex::from_rows(rows, embedder.as_ref()).unwrap();
        ServiceContext::from_parts(
            ServiceConfig::default(),
            embedder,
            Arc::new(index),
            Arc::new(InMemoryDirectory::new()),
            Arc::new(ConstantQuickFix::default()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_leaking_pipe() {
        let ctx = context();
        let analysis = ctx.analyze("Water is leaking from my kitchen pipe").await;

        assert_eq!(analysis.detected_category, "plumber");
        assert_eq!(analysis.available_workers.len(), 1);
        assert_eq!(analysis.available_workers[0].name, "Ramesh");
        assert_eq!(analysis.quick_fix, DEFAULT_ADVISORY);
    }

    #[tokio::test]
    async fn test_empty_query_degrades_to_fallback() {
        let ctx = context();
        let result = ctx.classify("   ").await;
        assert_eq!(result.category, "general_contractor");
        assert!(!result.matched);
    }

    #[tokio::test]
    async fn test_seed_then_live_lookup() {
        let ctx = context();
        assert!(ctx.seed().await.unwrap().seeded);

        let analysis = ctx.analyze("leaking pipe").await;
        assert!(analysis.available_workers[0].id.is_some());
        ctx.shutdown().await.unwrap();
    }

    #[test]
    fn test_initialize_with_hashing_backend() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("intents.csv");
        std::fs::write(&corpus, "text,category\nleaking pipe,plumber\nbroken window,glazier\n")
            .unwrap();

        let mut config = ServiceConfig::default();
        config.embedding.backend = EmbeddingBackend::Hashing;
        config.corpus.path = corpus;

        let ctx = ServiceContext::initialize(config).unwrap();
        assert_eq!(ctx.matcher().index().len(), 2);
        assert_eq!(ctx.embedder().model_name(), "feature-hashing");
    }

    #[test]
    fn test_initialize_missing_corpus_fails() {
        let mut config = ServiceConfig::default();
        config.embedding.backend = EmbeddingBackend::Hashing;
        config.corpus.path = "/nonexistent/intents.csv".into();

        assert!(ServiceContext::initialize(config).is_err());
    }
}
