//! Crate-level error type.
//!
//! Each subsystem has its own error enum; this one collects them for the
//! startup path and the CLI, where any failure is fatal.

use thiserror::Error;

use crate::advisory::AdvisoryError;
use crate::directory::DirectoryError;
use crate::search::{CorpusError, EmbeddingError, MatchError};

/// Top-level error.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corpus could not be loaded
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    /// Embedding model failure
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Matching failure
    #[error(transparent)]
    Match(#[from] MatchError),

    /// Worker directory failure
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Quick-fix generator failure
    #[error(transparent)]
    Advisory(#[from] AdvisoryError),

    /// Startup task failed outside any subsystem
    #[error("Startup error: {0}")]
    Startup(String),

    /// HTTP API failure
    #[error("API error: {0}")]
    Api(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("Invalid TOML: {}", err))
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(format!("Failed to serialize config: {}", err))
    }
}

/// Result alias for crate-level operations.
pub type Result<T> = std::result::Result<T, Error>;
