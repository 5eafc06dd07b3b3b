//! Semantic category matching.
//!
//! Maps a free-text problem description onto the service taxonomy:
//! - An [`Embedder`] turns text into dense vectors (FastEmbed ONNX model, or
//!   deterministic feature hashing for offline use)
//! - The [`TaxonomyIndex`] holds every corpus phrase with its precomputed vector
//! - The [`Matcher`] scores a query against the index by cosine similarity and
//!   picks a category, or the fallback when nothing clears the threshold
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌────────────────┐
//! │ service_intents  │────▶│    Embedder    │◀──── query text
//! │   (text, cat)    │     │  (FastEmbed)   │
//! └──────────────────┘     └───────┬────────┘
//!                                  │
//!                  ┌───────────────┴──────────────┐
//!                  ▼                              ▼
//!          ┌───────────────┐              ┌──────────────┐
//!          │ TaxonomyIndex │─── cosine ──▶│   Matcher    │
//!          │ [entry; vec]  │   scores     │ top-k + τ    │
//!          └───────────────┘              └──────┬───────┘
//!                                                │
//!                                                ▼
//!                                        ┌──────────────┐
//!                                        │ MatchResult  │
//!                                        └──────────────┘
//! ```

mod embedding;
mod matcher;
mod normalize;
mod similarity;
mod taxonomy;

pub use embedding::{
    resolve_model, Embedder, Embedding, EmbeddingError, EmbeddingService, EmbeddingServiceConfig,
    HashingEmbedder,
};
pub use matcher::{MatchError, MatchResult, Matcher, MatcherConfig, ScoredEntry};
pub use normalize::normalize_text;
pub use similarity::{cosine_similarity, l2_normalize_in_place};
pub use taxonomy::{parse_corpus, CorpusEntry, CorpusError, CorpusRow, TaxonomyIndex};

/// Default embedding model (all-MiniLM-L6-v2 - 384 dimensions, good balance of speed/quality)
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Embedding dimension for the default model
pub const EMBEDDING_DIM: usize = 384;
