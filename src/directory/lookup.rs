//! Bounded lookups with static fallback, and one-time seeding.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{DirectoryError, DirectoryResult, FallbackTable, Worker, WorkerDirectory};

/// Default upper bound on a single live lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Why a lookup was answered from the static table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The live directory has no workers in this category
    NoLiveWorkers,
    /// The live directory did not answer in time
    Timeout,
    /// The live directory returned an error
    Error(String),
}

impl FallbackReason {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            FallbackReason::NoLiveWorkers => "empty",
            FallbackReason::Timeout => "timeout",
            FallbackReason::Error(_) => "error",
        }
    }
}

/// Where a worker list came from.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryOutcome {
    Live(Vec<Worker>),
    Fallback {
        workers: Vec<Worker>,
        reason: FallbackReason,
    },
}

impl DirectoryOutcome {
    pub fn workers(&self) -> &[Worker] {
        match self {
            DirectoryOutcome::Live(workers) => workers,
            DirectoryOutcome::Fallback { workers, .. } => workers,
        }
    }

    pub fn into_workers(self) -> Vec<Worker> {
        match self {
            DirectoryOutcome::Live(workers) => workers,
            DirectoryOutcome::Fallback { workers, .. } => workers,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, DirectoryOutcome::Fallback { .. })
    }
}

/// Result of a seeding attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub seeded: bool,
    pub count: usize,
}

/// Live directory fronted by a timeout and the static fallback table.
pub struct WorkerLookup {
    directory: Arc<dyn WorkerDirectory>,
    fallback: FallbackTable,
    timeout: Duration,
    seed_lock: Mutex<()>,
}

impl WorkerLookup {
    pub fn new(directory: Arc<dyn WorkerDirectory>, fallback: FallbackTable) -> Self {
        Self {
            directory,
            fallback,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
            seed_lock: Mutex::new(()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn directory(&self) -> &Arc<dyn WorkerDirectory> {
        &self.directory
    }

    pub fn fallback_table(&self) -> &FallbackTable {
        &self.fallback
    }

    /// Query the live directory within the timeout.
    async fn query_live(&self, category: &str) -> DirectoryResult<Vec<Worker>> {
        match tokio::time::timeout(self.timeout, self.directory.list_by_category(category)).await
        {
            Ok(result) => result,
            Err(_) => Err(DirectoryError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    /// Look up workers, recording whether the static table was needed.
    pub async fn lookup(&self, category: &str) -> DirectoryOutcome {
        let reason = match self.query_live(category).await {
            Ok(workers) if !workers.is_empty() => {
                debug!(
                    "Found {} workers in {} directory for category: {}",
                    workers.len(),
                    self.directory.name(),
                    category
                );
                return DirectoryOutcome::Live(workers);
            }
            Ok(_) => {
                debug!("No workers in directory for {}, using fallback data", category);
                FallbackReason::NoLiveWorkers
            }
            Err(DirectoryError::Timeout(ms)) => {
                warn!("Directory lookup for {} timed out after {}ms", category, ms);
                FallbackReason::Timeout
            }
            Err(e) => {
                warn!("Error fetching workers for {}: {}", category, e);
                FallbackReason::Error(e.to_string())
            }
        };

        metrics::counter!("homefix_directory_fallback_total", "reason" => reason.label())
            .increment(1);

        DirectoryOutcome::Fallback {
            workers: self.fallback.get(category),
            reason,
        }
    }

    /// Workers for `category`, falling back to the static table. Never fails.
    pub async fn list_by_category(&self, category: &str) -> Vec<Worker> {
        self.lookup(category).await.into_workers()
    }

    /// Copy the fallback table into an empty live directory.
    ///
    /// A directory that already holds any worker is left untouched and the
    /// report says `seeded: false`. The rows are written in one all-or-nothing
    /// batch. Concurrent calls are serialized.
    pub async fn seed(&self) -> DirectoryResult<SeedReport> {
        let _guard = self.seed_lock.lock().await;

        if !self.directory.is_empty().await? {
            info!("Worker directory already has data, skipping seed");
            return Ok(SeedReport {
                seeded: false,
                count: 0,
            });
        }

        let workers: Vec<Worker> = self
            .fallback
            .all()
            .cloned()
            .map(|mut worker| {
                worker.id = None;
                worker.verified = true;
                worker
            })
            .collect();

        // One batch, so a failed seed leaves the directory empty and retryable
        let count = self.directory.insert_many(workers).await?.len();
        self.directory.flush().await?;

        metrics::counter!("homefix_workers_seeded_total").increment(count as u64);
        info!("Seeded {} workers into {} directory", count, self.directory.name());

        Ok(SeedReport {
            seeded: true,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FailingDirectory;

    #[async_trait]
    impl WorkerDirectory for FailingDirectory {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn list_by_category(&self, _category: &str) -> DirectoryResult<Vec<Worker>> {
            Err(DirectoryError::Unavailable("connection refused".into()))
        }

        async fn is_empty(&self) -> DirectoryResult<bool> {
            Err(DirectoryError::Unavailable("connection refused".into()))
        }

        async fn insert(&self, _worker: Worker) -> DirectoryResult<String> {
            Err(DirectoryError::Unavailable("connection refused".into()))
        }

        async fn insert_many(&self, _workers: Vec<Worker>) -> DirectoryResult<Vec<String>> {
            Err(DirectoryError::Unavailable("connection refused".into()))
        }
    }

    struct SlowDirectory;

    #[async_trait]
    impl WorkerDirectory for SlowDirectory {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn list_by_category(&self, _category: &str) -> DirectoryResult<Vec<Worker>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn is_empty(&self) -> DirectoryResult<bool> {
            Ok(true)
        }

        async fn insert(&self, _worker: Worker) -> DirectoryResult<String> {
            Ok(String::new())
        }

        async fn insert_many(&self, workers: Vec<Worker>) -> DirectoryResult<Vec<String>> {
            Ok(vec![String::new(); workers.len()])
        }
    }

    /// In-memory store whose fourth row write fails on the first attempt.
    struct FlakyDirectory {
        inner: InMemoryDirectory,
        failed_once: AtomicBool,
    }

    impl FlakyDirectory {
        fn new() -> Self {
            Self {
                inner: InMemoryDirectory::new(),
                failed_once: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl WorkerDirectory for FlakyDirectory {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn list_by_category(&self, category: &str) -> DirectoryResult<Vec<Worker>> {
            self.inner.list_by_category(category).await
        }

        async fn is_empty(&self) -> DirectoryResult<bool> {
            self.inner.is_empty().await
        }

        async fn insert(&self, worker: Worker) -> DirectoryResult<String> {
            self.inner.insert(worker).await
        }

        async fn insert_many(&self, workers: Vec<Worker>) -> DirectoryResult<Vec<String>> {
            // Rows are staged and only committed once all of them encode
            let mut staged = Vec::with_capacity(workers.len());
            for (n, worker) in workers.into_iter().enumerate() {
                if n == 3 && !self.failed_once.swap(true, Ordering::SeqCst) {
                    return Err(DirectoryError::Storage("disk full".into()));
                }
                staged.push(worker);
            }
            self.inner.insert_many(staged).await
        }
    }

    fn memory_lookup() -> WorkerLookup {
        WorkerLookup::new(Arc::new(InMemoryDirectory::new()), FallbackTable::default())
    }

    #[tokio::test]
    async fn test_empty_directory_uses_fallback() {
        let lookup = memory_lookup();
        let outcome = lookup.lookup("plumber").await;
        assert_eq!(
            outcome,
            DirectoryOutcome::Fallback {
                workers: FallbackTable::default().get("plumber"),
                reason: FallbackReason::NoLiveWorkers,
            }
        );
    }

    #[tokio::test]
    async fn test_error_is_absorbed() {
        let lookup = WorkerLookup::new(Arc::new(FailingDirectory), FallbackTable::default());
        let outcome = lookup.lookup("electrician").await;
        assert!(matches!(
            outcome,
            DirectoryOutcome::Fallback {
                reason: FallbackReason::Error(_),
                ..
            }
        ));
        assert_eq!(outcome.workers()[0].name, "Suresh");
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let lookup = WorkerLookup::new(Arc::new(SlowDirectory), FallbackTable::default())
            .with_timeout(Duration::from_millis(50));
        let outcome = lookup.lookup("locksmith").await;
        assert!(matches!(
            outcome,
            DirectoryOutcome::Fallback {
                reason: FallbackReason::Timeout,
                ..
            }
        ));
        assert_eq!(outcome.workers().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_category_yields_empty_list() {
        let lookup = memory_lookup();
        assert!(lookup.list_by_category("astronaut").await.is_empty());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let lookup = memory_lookup();

        let first = lookup.seed().await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                seeded: true,
                count: 18
            }
        );

        let second = lookup.seed().await.unwrap();
        assert_eq!(
            second,
            SeedReport {
                seeded: false,
                count: 0
            }
        );

        let plumbers = lookup.directory().list_by_category("plumber").await.unwrap();
        assert_eq!(plumbers.len(), 1);
    }

    #[tokio::test]
    async fn test_seeded_directory_serves_live_workers() {
        let lookup = memory_lookup();
        lookup.seed().await.unwrap();

        let outcome = lookup.lookup("welder").await;
        assert!(!outcome.is_fallback());
        assert!(outcome.workers()[0].id.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_seeds_insert_once() {
        let lookup = Arc::new(memory_lookup());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lookup = Arc::clone(&lookup);
                tokio::spawn(async move { lookup.seed().await.unwrap() })
            })
            .collect();

        let mut seeded = 0;
        for handle in handles {
            if handle.await.unwrap().seeded {
                seeded += 1;
            }
        }
        assert_eq!(seeded, 1);
        assert_eq!(
            lookup.directory().list_by_category("cleaning").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_seed_error_propagates() {
        let lookup = WorkerLookup::new(Arc::new(FailingDirectory), FallbackTable::default());
        assert!(lookup.seed().await.is_err());
    }

    #[tokio::test]
    async fn test_failed_seed_leaves_directory_empty_and_retryable() {
        let lookup = WorkerLookup::new(Arc::new(FlakyDirectory::new()), FallbackTable::default());

        assert!(lookup.seed().await.is_err());
        assert!(lookup.directory().is_empty().await.unwrap());
        assert!(lookup.lookup("plumber").await.is_fallback());

        let retry = lookup.seed().await.unwrap();
        assert_eq!(
            retry,
            SeedReport {
                seeded: true,
                count: 18
            }
        );
        assert!(!lookup.lookup("plumber").await.is_fallback());
    }
}
