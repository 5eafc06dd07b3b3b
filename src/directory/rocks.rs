//! Persistent worker directory on RocksDB.
//!
//! Keys are `worker␟<category>␟<id>` so a category listing is a prefix scan.
//! Values are bincode-encoded [`StoredWorker`] records.

use async_trait::async_trait;
use rocksdb::{Direction, IteratorMode, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{new_worker_id, DirectoryError, DirectoryResult, Worker, WorkerDirectory};

const KEY_PREFIX: &str = "worker";
const SEP: char = '\u{1f}';

/// On-disk shape. Kept separate from [`Worker`] because bincode cannot skip
/// optional fields the way the JSON representation does.
#[derive(Debug, Serialize, Deserialize)]
struct StoredWorker {
    id: String,
    name: String,
    location: String,
    rating: f64,
    hourly_rate: f64,
    experience: String,
    category: String,
    verified: bool,
}

impl From<StoredWorker> for Worker {
    fn from(stored: StoredWorker) -> Self {
        Worker {
            id: Some(stored.id),
            name: stored.name,
            location: stored.location,
            rating: stored.rating,
            hourly_rate: stored.hourly_rate,
            experience: stored.experience,
            category: stored.category,
            verified: stored.verified,
        }
    }
}

fn category_prefix(category: &str) -> String {
    format!("{KEY_PREFIX}{SEP}{category}{SEP}")
}

/// Assign an id and encode a worker as `(id, key, value)`.
fn encode_worker(worker: Worker) -> DirectoryResult<(String, String, Vec<u8>)> {
    let id = new_worker_id();
    let key = format!("{}{}", category_prefix(&worker.category), id);
    let stored = StoredWorker {
        id: id.clone(),
        name: worker.name,
        location: worker.location,
        rating: worker.rating,
        hourly_rate: worker.hourly_rate,
        experience: worker.experience,
        category: worker.category,
        verified: worker.verified,
    };
    let value = bincode::serialize(&stored)?;
    Ok((id, key, value))
}

/// RocksDB-backed directory.
pub struct RocksDirectory {
    db: Arc<DB>,
}

impl RocksDirectory {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> DirectoryResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DirectoryError::Storage(format!("{}: {}", parent.display(), e)))?;
        }
        let db = DB::open_default(path)?;
        info!("Opened worker directory at {}", path.display());
        Ok(Self { db: Arc::new(db) })
    }

    async fn blocking<T, F>(&self, op: F) -> DirectoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DB) -> DirectoryResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(db.as_ref()))
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("storage task failed: {}", e)))?
    }
}

#[async_trait]
impl WorkerDirectory for RocksDirectory {
    fn name(&self) -> &'static str {
        "rocksdb"
    }

    async fn list_by_category(&self, category: &str) -> DirectoryResult<Vec<Worker>> {
        let prefix = category_prefix(category);
        self.blocking(move |db| {
            let mut workers = Vec::new();
            let iter = db.iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
            for item in iter {
                let (key, value) = item?;
                if !key.starts_with(prefix.as_bytes()) {
                    break;
                }
                let stored: StoredWorker = bincode::deserialize(&value)?;
                workers.push(stored.into());
            }
            Ok(workers)
        })
        .await
    }

    async fn is_empty(&self) -> DirectoryResult<bool> {
        self.blocking(|db| match db.iterator(IteratorMode::Start).next() {
            None => Ok(true),
            Some(Ok(_)) => Ok(false),
            Some(Err(e)) => Err(e.into()),
        })
        .await
    }

    async fn insert(&self, worker: Worker) -> DirectoryResult<String> {
        let (id, key, value) = encode_worker(worker)?;
        self.blocking(move |db| Ok(db.put(key.as_bytes(), value)?))
            .await?;
        Ok(id)
    }

    async fn insert_many(&self, workers: Vec<Worker>) -> DirectoryResult<Vec<String>> {
        let mut batch = WriteBatch::default();
        let mut ids = Vec::with_capacity(workers.len());
        for worker in workers {
            let (id, key, value) = encode_worker(worker)?;
            batch.put(key.as_bytes(), value);
            ids.push(id);
        }
        self.blocking(move |db| Ok(db.write(batch)?)).await?;
        Ok(ids)
    }

    async fn flush(&self) -> DirectoryResult<()> {
        self.blocking(|db| Ok(db.flush()?)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::fallback_workers;

    #[tokio::test]
    async fn test_roundtrip_and_category_isolation() {
        let dir = tempfile::tempdir().unwrap();
        let directory = RocksDirectory::open(dir.path().join("workers")).unwrap();
        assert!(directory.is_empty().await.unwrap());

        let workers = fallback_workers();
        for worker in workers.iter().cloned() {
            directory.insert(worker).await.unwrap();
        }

        assert!(!directory.is_empty().await.unwrap());
        let plumbers = directory.list_by_category("plumber").await.unwrap();
        assert_eq!(plumbers.len(), 1);
        assert_eq!(plumbers[0].name, "Ramesh");
        assert!(plumbers[0].verified);
        assert!(plumbers[0].id.is_some());

        // "gas" is a prefix of "gas_technician" but not a category of its own
        assert!(directory.list_by_category("gas").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_many_writes_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let directory = RocksDirectory::open(dir.path().join("workers")).unwrap();

        let workers = fallback_workers();
        let ids = directory.insert_many(workers.clone()).await.unwrap();
        assert_eq!(ids.len(), workers.len());

        let welders = directory.list_by_category("welder").await.unwrap();
        assert_eq!(welders.len(), 1);
        assert_eq!(welders[0].name, "Ravi");
        assert!(ids.contains(welders[0].id.as_ref().unwrap()));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workers");
        {
            let directory = RocksDirectory::open(&path).unwrap();
            let worker = fallback_workers().remove(0);
            directory.insert(worker).await.unwrap();
            directory.flush().await.unwrap();
        }

        let reopened = RocksDirectory::open(&path).unwrap();
        assert_eq!(reopened.list_by_category("plumber").await.unwrap().len(), 1);
    }
}
