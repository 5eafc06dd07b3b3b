//! Process-local worker directory.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{new_worker_id, DirectoryResult, Worker, WorkerDirectory};

/// Directory held in memory; starts empty and is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    workers: RwLock<Vec<Worker>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.workers.read().await.len()
    }
}

#[async_trait]
impl WorkerDirectory for InMemoryDirectory {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list_by_category(&self, category: &str) -> DirectoryResult<Vec<Worker>> {
        let workers = self.workers.read().await;
        Ok(workers
            .iter()
            .filter(|w| w.category == category)
            .cloned()
            .collect())
    }

    async fn is_empty(&self) -> DirectoryResult<bool> {
        Ok(self.workers.read().await.is_empty())
    }

    async fn insert(&self, mut worker: Worker) -> DirectoryResult<String> {
        let id = new_worker_id();
        worker.id = Some(id.clone());
        self.workers.write().await.push(worker);
        Ok(id)
    }

    async fn insert_many(&self, workers: Vec<Worker>) -> DirectoryResult<Vec<String>> {
        let mut ids = Vec::with_capacity(workers.len());
        let staged: Vec<Worker> = workers
            .into_iter()
            .map(|mut worker| {
                let id = new_worker_id();
                worker.id = Some(id.clone());
                ids.push(id);
                worker
            })
            .collect();
        self.workers.write().await.extend(staged);
        Ok(ids)
    }
}
