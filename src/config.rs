//! Node configuration.
//!
//! Loaded from a TOML file (default `config.toml`). Every section has defaults,
//! so a partial file or no file at all is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default confidence threshold for a corpus hit to count as a match.
pub const DEFAULT_THRESHOLD: f32 = 0.55;

/// Default number of top-scoring corpus entries inspected per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Category returned when nothing in the corpus clears the threshold.
pub const DEFAULT_FALLBACK_CATEGORY: &str = "general_contractor";

/// Advisory returned by the constant quick-fix strategy.
pub const DEFAULT_ADVISORY: &str =
    "Turn off the main supply and keep the area dry until the professional arrives.";

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub api: ApiSection,
    pub corpus: CorpusSection,
    pub embedding: EmbeddingSection,
    pub matcher: MatcherSection,
    pub directory: DirectorySection,
    pub quick_fix: QuickFixSection,
    pub metrics: MetricsSection,
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Socket address the API binds to
    pub listen_address: String,
    /// Whether to attach a CORS layer
    pub cors_enabled: bool,
    /// Allowed origins; `["*"]` allows any origin
    pub cors_origins: Vec<String>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Static corpus location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSection {
    /// CSV file with a `text,category` header
    pub path: PathBuf,
}

impl Default for CorpusSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/service_intents.csv"),
        }
    }
}

/// Which embedder implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// ONNX sentence-transformer via fastembed
    #[default]
    Fastembed,
    /// Deterministic feature hashing, no model download
    Hashing,
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub backend: EmbeddingBackend,
    /// Model name, see `search::embedding::resolve_model`
    pub model: String,
    /// Where downloaded model files are cached
    pub cache_dir: Option<PathBuf>,
    pub show_download_progress: bool,
    /// Number of query embeddings kept in the LRU cache (0 disables it)
    pub query_cache_capacity: usize,
    /// Dimension of the hashing backend
    pub hashing_dimension: usize,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Fastembed,
            model: crate::search::DEFAULT_MODEL.to_string(),
            cache_dir: None,
            show_download_progress: true,
            query_cache_capacity: 1024,
            hashing_dimension: crate::search::EMBEDDING_DIM,
        }
    }
}

/// Category selection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherSection {
    pub top_k: usize,
    pub threshold: f32,
    pub fallback_category: String,
}

impl Default for MatcherSection {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
            fallback_category: DEFAULT_FALLBACK_CATEGORY.to_string(),
        }
    }
}

/// Worker directory backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryBackend {
    /// Process-local, empty at startup
    #[default]
    Memory,
    /// Persistent RocksDB store
    Rocksdb,
}

/// Worker directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySection {
    pub backend: DirectoryBackend,
    /// RocksDB data directory
    pub path: PathBuf,
    /// Upper bound on a single lookup before the static table is used
    pub lookup_timeout_ms: u64,
}

impl Default for DirectorySection {
    fn default() -> Self {
        Self {
            backend: DirectoryBackend::Memory,
            path: PathBuf::from("data/workers.db"),
            lookup_timeout_ms: 2_000,
        }
    }
}

/// Quick-fix strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickFixStrategy {
    #[default]
    Constant,
    Generative,
}

/// Quick-fix settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickFixSection {
    pub strategy: QuickFixStrategy,
    /// Text returned by the constant strategy, and by the generative one when rate limited
    pub advisory: String,
    /// Generative model name
    pub model: String,
    /// Base URL of the generative API
    pub endpoint: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub requests_per_minute: u32,
    pub timeout_ms: u64,
}

impl Default for QuickFixSection {
    fn default() -> Self {
        Self {
            strategy: QuickFixStrategy::Constant,
            advisory: DEFAULT_ADVISORY.to_string(),
            model: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            requests_per_minute: 10,
            timeout_ms: 10_000,
        }
    }
}

/// Metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSection {
    pub enabled: bool,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ServiceConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: ServiceConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.matcher.top_k == 0 {
            return Err(Error::Config("matcher.top_k must be at least 1".into()));
        }
        if !self.matcher.threshold.is_finite() || !(-1.0..=1.0).contains(&self.matcher.threshold)
        {
            return Err(Error::Config(format!(
                "matcher.threshold must be within [-1, 1], got {}",
                self.matcher.threshold
            )));
        }
        if self.matcher.fallback_category.trim().is_empty() {
            return Err(Error::Config(
                "matcher.fallback_category must not be empty".into(),
            ));
        }
        if self.embedding.backend == EmbeddingBackend::Hashing && self.embedding.hashing_dimension == 0
        {
            return Err(Error::Config(
                "embedding.hashing_dimension must be positive".into(),
            ));
        }
        if self.directory.lookup_timeout_ms == 0 {
            return Err(Error::Config(
                "directory.lookup_timeout_ms must be positive".into(),
            ));
        }
        if self.quick_fix.strategy == QuickFixStrategy::Generative
            && self.quick_fix.requests_per_minute == 0
        {
            return Err(Error::Config(
                "quick_fix.requests_per_minute must be positive for the generative strategy"
                    .into(),
            ));
        }
        Ok(())
    }
}
