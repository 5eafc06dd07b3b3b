//! Worker directory.
//!
//! The live directory is an external store behind the [`WorkerDirectory`]
//! trait. [`WorkerLookup`] puts a timeout and the static fallback table in
//! front of it: callers always receive some worker list, while the
//! [`DirectoryOutcome`] still records whether it came from the live store.

mod fallback;
mod lookup;
mod memory;
mod rocks;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fallback::{fallback_workers, FallbackTable};
pub use lookup::{DirectoryOutcome, FallbackReason, SeedReport, WorkerLookup};
pub use memory::InMemoryDirectory;
pub use rocks::RocksDirectory;

/// A worker offering a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    /// Assigned by the directory on insert; absent on static fallback rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub location: String,
    pub rating: f64,
    pub hourly_rate: f64,
    pub experience: String,
    pub category: String,
    #[serde(default)]
    pub verified: bool,
}

/// Directory failures. These never reach HTTP callers; [`WorkerLookup`]
/// absorbs them into the fallback table.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Directory lookup timed out after {0}ms")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt worker record: {0}")]
    Corrupt(String),
}

impl From<rocksdb::Error> for DirectoryError {
    fn from(err: rocksdb::Error) -> Self {
        DirectoryError::Storage(err.to_string())
    }
}

impl From<bincode::Error> for DirectoryError {
    fn from(err: bincode::Error) -> Self {
        DirectoryError::Corrupt(err.to_string())
    }
}

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// A live worker store.
#[async_trait]
pub trait WorkerDirectory: Send + Sync {
    /// Backend name for logs and health output
    fn name(&self) -> &'static str;

    /// Workers registered under `category`, possibly none.
    async fn list_by_category(&self, category: &str) -> DirectoryResult<Vec<Worker>>;

    /// Whether the store holds no workers at all.
    async fn is_empty(&self) -> DirectoryResult<bool>;

    /// Store a worker and return its assigned id.
    async fn insert(&self, worker: Worker) -> DirectoryResult<String>;

    /// Store all workers or none of them, returning ids in input order.
    async fn insert_many(&self, workers: Vec<Worker>) -> DirectoryResult<Vec<String>>;

    /// Persist buffered writes. No-op for stores without buffering.
    async fn flush(&self) -> DirectoryResult<()> {
        Ok(())
    }
}

pub(crate) fn new_worker_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
