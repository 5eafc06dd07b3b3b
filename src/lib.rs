//! HomeFix router
//!
//! Takes a free-text description of a household problem, maps it onto a
//! service category by embedding similarity against a labelled corpus, and
//! answers with workers in that category plus a short safety tip.
//!
//! # Modules
//!
//! - [`search`]: embedders, corpus index and the category matcher
//! - [`directory`]: worker storage with a static fallback table
//! - [`advisory`]: quick-fix tip strategies
//! - [`context`]: the state shared by the API and the CLI
//! - [`api`]: axum HTTP server
//! - [`config`]: TOML configuration
//! - [`metrics`]: Prometheus recorder

pub mod advisory;
pub mod api;
pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod metrics;
pub mod search;

pub use advisory::{
    build_quick_fix, AdvisoryError, ConstantQuickFix, GenerativeQuickFix, QuickFixGenerator,
};
pub use api::{ApiConfig, ApiServer, AppState, HealthResponse};
pub use config::ServiceConfig;
pub use context::{Analysis, ServiceContext};
pub use directory::{
    DirectoryError, DirectoryOutcome, FallbackTable, InMemoryDirectory, RocksDirectory,
    SeedReport, Worker, WorkerDirectory, WorkerLookup,
};
pub use error::{Error, Result};
pub use crate::metrics::{MetricsConfig, MetricsService};
pub use search::{
    Embedder, EmbeddingService, HashingEmbedder, MatchResult, Matcher, MatcherConfig,
    TaxonomyIndex,
};
