//! Text embedding backends.
//!
//! [`EmbeddingService`] wraps a FastEmbed ONNX sentence-transformer and keeps an
//! LRU cache of query vectors. [`HashingEmbedder`] is a deterministic
//! bag-of-words fallback that needs no model download.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use super::similarity::l2_normalize_in_place;
use super::{DEFAULT_MODEL, EMBEDDING_DIM};

/// A dense text vector.
pub type Embedding = Vec<f32>;

/// Embedding failures.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Unknown embedding model '{0}'")]
    UnknownModel(String),

    #[error("Failed to load embedding model '{model}': {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("Embedding inference failed: {0}")]
    Inference(String),

    #[error("Embedder returned {got} vectors for {expected} inputs")]
    BatchSize { expected: usize, got: usize },
}

/// Anything that maps text into a fixed-length vector space.
///
/// Implementations must be deterministic for a given model version: the corpus
/// is encoded once at startup and compared against queries encoded later.
pub trait Embedder: Send + Sync {
    /// Encode a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError>;

    /// Encode a single text.
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        match vectors.len() {
            1 => Ok(vectors.remove(0)),
            got => Err(EmbeddingError::BatchSize { expected: 1, got }),
        }
    }

    /// Output dimensionality.
    fn dimension(&self) -> usize;

    /// Model identifier, for logs and health output.
    fn model_name(&self) -> &str;
}

/// Map a configured model name onto a FastEmbed model.
pub fn resolve_model(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
    let model = match name.to_ascii_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
            EmbeddingModel::AllMiniLML6V2
        }
        "all-minilm-l12-v2" | "sentence-transformers/all-minilm-l12-v2" => {
            EmbeddingModel::AllMiniLML12V2
        }
        "paraphrase-multilingual-mpnet-base-v2" => EmbeddingModel::ParaphraseMLMpnetBaseV2,
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" | "baai/bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "nomic-embed-text-v1.5" => EmbeddingModel::NomicEmbedTextV15,
        _ => return Err(EmbeddingError::UnknownModel(name.to_string())),
    };
    Ok(model)
}

/// Configuration for [`EmbeddingService`].
#[derive(Debug, Clone)]
pub struct EmbeddingServiceConfig {
    pub model: String,
    pub cache_dir: Option<PathBuf>,
    pub show_download_progress: bool,
    /// Query vectors kept in memory; 0 disables the cache
    pub query_cache_capacity: usize,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            cache_dir: None,
            show_download_progress: true,
            query_cache_capacity: 1024,
        }
    }
}

/// FastEmbed-backed embedder.
pub struct EmbeddingService {
    model: TextEmbedding,
    model_name: String,
    dimension: usize,
    query_cache: Option<Mutex<LruCache<String, Embedding>>>,
}

impl EmbeddingService {
    /// Load the default model.
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::with_config(EmbeddingServiceConfig::default())
    }

    /// Load a model, downloading it on first use.
    pub fn with_config(config: EmbeddingServiceConfig) -> Result<Self, EmbeddingError> {
        let model_kind = resolve_model(&config.model)?;

        let mut options =
            InitOptions::new(model_kind).with_show_download_progress(config.show_download_progress);
        if let Some(dir) = config.cache_dir.clone() {
            options = options.with_cache_dir(dir);
        }

        let model = TextEmbedding::try_new(options).map_err(|e| EmbeddingError::ModelLoad {
            model: config.model.clone(),
            reason: e.to_string(),
        })?;

        // Probe once rather than trusting a hardcoded table.
        let probe = model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| EmbeddingError::ModelLoad {
                model: config.model.clone(),
                reason: e.to_string(),
            })?;
        let dimension = probe.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(EmbeddingError::ModelLoad {
                model: config.model,
                reason: "model produced an empty vector".to_string(),
            });
        }

        info!("Embedding model {} ready ({}d)", config.model, dimension);

        let query_cache = NonZeroUsize::new(config.query_cache_capacity)
            .map(|capacity| Mutex::new(LruCache::new(capacity)));

        Ok(Self {
            model,
            model_name: config.model,
            dimension,
            query_cache,
        })
    }

    fn cached(&self, text: &str) -> Option<Embedding> {
        let cache = self.query_cache.as_ref()?;
        let mut guard = cache.lock().ok()?;
        guard.get(text).cloned()
    }

    fn remember(&self, text: &str, embedding: &Embedding) {
        if let Some(cache) = &self.query_cache {
            if let Ok(mut guard) = cache.lock() {
                guard.put(text.to_string(), embedding.clone());
            }
        }
    }
}

impl Embedder for EmbeddingService {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::BatchSize {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        Ok(vectors)
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if let Some(hit) = self.cached(text) {
            debug!("query embedding cache hit");
            return Ok(hit);
        }
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        let embedding = match vectors.len() {
            1 => vectors.remove(0),
            got => return Err(EmbeddingError::BatchSize { expected: 1, got }),
        };
        self.remember(text, &embedding);
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "at", "be", "but", "by", "for", "from", "has", "have", "i", "in",
    "is", "it", "its", "me", "my", "of", "on", "or", "our", "so", "the", "there", "this", "to",
    "was", "we", "with",
];

/// Deterministic feature-hashing embedder.
///
/// Tokens are lowercased alphanumeric runs with stop words removed and a few
/// English suffixes stripped, each hashed into one bucket; the result is
/// L2-normalized. Shared vocabulary yields positive cosine similarity, which is
/// enough for offline runs and tests but not for paraphrase detection.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .filter(|t| !STOP_WORDS.contains(&t.as_str()))
            .map(|t| stem(&t))
    }

    fn encode(&self, text: &str) -> Embedding {
        let mut v = vec![0.0f32; self.dimension];
        for token in Self::tokens(text) {
            let bucket = (fxhash::hash64(token.as_bytes()) % self.dimension as u64) as usize;
            v[bucket] += 1.0;
        }
        l2_normalize_in_place(&mut v);
        v
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

fn stem(token: &str) -> String {
    for suffix in ["ing", "ed", "s"] {
        if let Some(root) = token.strip_suffix(suffix) {
            if root.chars().count() >= 3 {
                return root.to_string();
            }
        }
    }
    token.to_string()
}

impl Embedder for HashingEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.encode(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }
}
