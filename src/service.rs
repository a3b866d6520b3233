//! The Sentinel facade
//!
//! Wires the job store, the uploads directory and the worker pool together
//! behind the operations the surrounding application needs: submit a
//! document, read a batch back (progress, results, metrics), list and
//! delete batches, and shut down cleanly.

use crate::batch::{load_metrics, load_progress, BatchMetrics, BatchProgress};
use crate::config::Config;
use crate::crawler::{JobProcessor, RetryPolicy, WorkerPool};
use crate::ingest::{
    candidate_urls, extract_document, spawn_dispatch, store_document, DispatchReport,
    DocumentFormat,
};
use crate::state::Owner;
use crate::storage::{lock_storage, CrawlData, JobStore, SharedStorage, SqliteStorage};
use crate::{Result, SentinelError};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// An accepted upload
///
/// `candidates_found` is known as soon as the document is parsed; job
/// creation continues in the background and can be awaited with
/// [`Submission::wait`].
#[derive(Debug)]
pub struct Submission {
    pub batch_key: String,
    pub candidates_found: usize,
    dispatch: JoinHandle<DispatchReport>,
}

impl Submission {
    /// Waits for every job of the batch to be created and enqueued
    pub async fn wait(self) -> Result<DispatchReport> {
        Ok(self.dispatch.await?)
    }
}

/// A running crawl service
pub struct Sentinel {
    config: Config,
    storage: SharedStorage,
    pool: WorkerPool,
}

impl Sentinel {
    /// Opens the configured database and starts the worker pool
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(config: Config) -> Result<Self> {
        let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
        Self::with_storage(config, storage.into_shared())
    }

    /// Starts the worker pool over an existing store
    pub fn with_storage(config: Config, storage: SharedStorage) -> Result<Self> {
        let processor = JobProcessor::new(config.fetch.clone(), storage.clone())?;
        Ok(Self::start(config, storage, processor))
    }

    /// Like [`Sentinel::with_storage`] with a custom retry policy
    pub fn with_retry_policy(
        config: Config,
        storage: SharedStorage,
        retry: Arc<dyn RetryPolicy>,
    ) -> Result<Self> {
        let processor =
            JobProcessor::new(config.fetch.clone(), storage.clone())?.with_retry_policy(retry);
        Ok(Self::start(config, storage, processor))
    }

    fn start(config: Config, storage: SharedStorage, processor: JobProcessor) -> Self {
        let pool = WorkerPool::start(
            config.pool.workers as usize,
            config.pool.queue_capacity as usize,
            Arc::new(processor),
        );
        Self {
            config,
            storage,
            pool,
        }
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Accepts an uploaded document and starts dispatching its URLs
    ///
    /// The format comes from the extension of `file_name`. Nothing is stored
    /// and no job is created when the owner is over its batch limit or the
    /// document cannot be parsed.
    ///
    /// # Returns
    ///
    /// * `Ok(Submission)` - Batch key and number of extracted candidates
    /// * `Err(SentinelError::Extract)` - Unsupported or malformed document
    /// * `Err(SentinelError::BatchLimitReached)` - Owner has too many batches
    pub fn submit_document(&self, bytes: &[u8], file_name: &str, owner: Owner) -> Result<Submission> {
        let format = DocumentFormat::from_file_name(file_name)?;
        self.check_batch_limit(owner)?;

        let candidates = extract_document(bytes, format)?;
        let urls = candidate_urls(format, &candidates);
        let batch_key = store_document(&self.uploads_dir(), file_name, bytes)?;

        tracing::info!(
            "Accepted {} for {}: {} candidates, {} crawlable URLs",
            batch_key,
            owner,
            candidates.len(),
            urls.len()
        );

        let dispatch = spawn_dispatch(
            self.storage.clone(),
            self.pool.queue(),
            batch_key.clone(),
            owner,
            candidates.len(),
            urls,
        );

        Ok(Submission {
            batch_key,
            candidates_found: candidates.len(),
            dispatch,
        })
    }

    pub fn get_job_progress(&self, batch_key: &str) -> Result<BatchProgress> {
        let storage = lock_storage(&self.storage)?;
        load_progress(&*storage, batch_key)
    }

    /// All crawl results of a batch, in no particular order
    pub fn get_job_results(&self, batch_key: &str) -> Result<Vec<CrawlData>> {
        let storage = lock_storage(&self.storage)?;
        Ok(storage.get_job_results(batch_key)?)
    }

    pub fn get_job_metrics(&self, batch_key: &str) -> Result<BatchMetrics> {
        let storage = lock_storage(&self.storage)?;
        load_metrics(&*storage, batch_key)
    }

    /// Batch keys owned by `owner`, newest first; always empty for guests
    pub fn list_batches(&self, owner: Owner) -> Result<Vec<String>> {
        let storage = lock_storage(&self.storage)?;
        visible_batches(&*storage, owner)
    }

    /// Deletes an owner's batch and its stored document
    ///
    /// Returns the number of jobs removed.
    pub fn delete_batch(&self, batch_key: &str, owner: Owner) -> Result<u64> {
        let mut storage = lock_storage(&self.storage)?;
        remove_batch(&mut *storage, &self.uploads_dir(), batch_key, owner)
    }

    /// Stops accepting jobs, drains the queue and waits for the workers
    ///
    /// Returns the number of jobs processed over the service's lifetime.
    pub async fn shutdown(self) -> usize {
        self.pool.shutdown().await
    }

    fn uploads_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.storage.uploads_dir)
    }

    fn check_batch_limit(&self, owner: Owner) -> Result<()> {
        let limit = self.config.limits.max_batches_per_owner;
        if owner.is_guest() || limit == 0 {
            return Ok(());
        }

        let existing = lock_storage(&self.storage)?.count_batches(owner)?;
        if existing >= u64::from(limit) {
            tracing::warn!("{} has {} batches, refusing upload", owner, existing);
            return Err(SentinelError::BatchLimitReached { limit });
        }
        Ok(())
    }
}

/// Batch keys visible to `owner`
pub fn visible_batches(storage: &dyn JobStore, owner: Owner) -> Result<Vec<String>> {
    if owner.is_guest() {
        return Ok(Vec::new());
    }
    Ok(storage.list_batches(owner)?)
}

/// Deletes an owner's batch rows and, if any were removed, its document
///
/// Removing the document is best effort: a missing or locked file is
/// logged, not returned.
pub fn remove_batch(
    storage: &mut dyn JobStore,
    uploads_dir: &Path,
    batch_key: &str,
    owner: Owner,
) -> Result<u64> {
    if owner.is_guest() {
        return Err(SentinelError::GuestForbidden);
    }

    let deleted = storage.delete_batch(batch_key, owner)?;
    if deleted == 0 {
        tracing::debug!("No jobs for {} owned by {}", batch_key, owner);
        return Ok(0);
    }

    // Keys are bare file names; anything with a path component is not ours
    if Path::new(batch_key).file_name() == Some(OsStr::new(batch_key)) {
        if let Err(e) = std::fs::remove_file(uploads_dir.join(batch_key)) {
            tracing::warn!("Could not remove document {}: {}", batch_key, e);
        }
    }

    tracing::info!("Deleted batch {} ({} jobs)", batch_key, deleted);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::JobStatus;
    use crate::storage::WEB_JOB_TYPE;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir, max_batches: u32) -> Config {
        let mut config = Config::default();
        config.pool.workers = 2;
        config.pool.queue_capacity = 8;
        config.fetch.request_timeout_ms = 500;
        config.storage.uploads_dir = dir.path().join("uploads").to_string_lossy().into_owned();
        config.limits.max_batches_per_owner = max_batches;
        config
    }

    fn open(dir: &TempDir, max_batches: u32) -> Sentinel {
        let storage = SqliteStorage::new_in_memory().unwrap().into_shared();
        Sentinel::with_storage(test_config(dir, max_batches), storage).unwrap()
    }

    #[tokio::test]
    async fn test_submit_counts_all_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = open(&dir, 10);

        let doc = b"http://127.0.0.1:1/a\nnot-a-url\nhttp://127.0.0.1:1/b";
        let submission = sentinel.submit_document(doc, "urls.txt", Owner::User(1)).unwrap();
        assert_eq!(submission.candidates_found, 3);
        assert!(submission.batch_key.ends_with("_urls.txt"));

        let key = submission.batch_key.clone();
        let report = submission.wait().await.unwrap();
        assert_eq!(report.valid, 2);
        assert_eq!(report.enqueued, 2);

        sentinel.shutdown_and_check(&key, 2).await;
    }

    #[tokio::test]
    async fn test_unsupported_document_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = open(&dir, 10);

        let err = sentinel
            .submit_document(b"irrelevant", "urls.docx", Owner::User(1))
            .unwrap_err();
        assert!(matches!(err, SentinelError::Extract(_)));
        assert!(!dir.path().join("uploads").exists());
        assert!(sentinel.list_batches(Owner::User(1)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_limit() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = open(&dir, 1);
        let owner = Owner::User(3);

        let first = sentinel
            .submit_document(b"http://127.0.0.1:1/", "a.txt", owner)
            .unwrap();
        first.wait().await.unwrap();

        let err = sentinel
            .submit_document(b"http://127.0.0.1:1/", "b.txt", owner)
            .unwrap_err();
        assert!(matches!(err, SentinelError::BatchLimitReached { limit: 1 }));

        // Guests are never limited
        let guest = sentinel
            .submit_document(b"http://127.0.0.1:1/", "c.txt", Owner::Guest)
            .unwrap();
        guest.wait().await.unwrap();

        sentinel.shutdown().await;
    }

    #[tokio::test]
    async fn test_guest_cannot_list_or_delete() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = open(&dir, 10);

        let submission = sentinel
            .submit_document(b"http://127.0.0.1:1/", "g.txt", Owner::Guest)
            .unwrap();
        let key = submission.batch_key.clone();
        submission.wait().await.unwrap();

        assert!(sentinel.list_batches(Owner::Guest).unwrap().is_empty());
        assert!(matches!(
            sentinel.delete_batch(&key, Owner::Guest),
            Err(SentinelError::GuestForbidden)
        ));

        sentinel.shutdown().await;
    }

    #[tokio::test]
    async fn test_delete_removes_rows_and_document() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = open(&dir, 10);
        let owner = Owner::User(9);

        let submission = sentinel
            .submit_document(br#"["http://127.0.0.1:1/"]"#, "list.json", owner)
            .unwrap();
        let key = submission.batch_key.clone();
        submission.wait().await.unwrap();

        let document = dir.path().join("uploads").join(&key);
        assert!(document.exists());
        assert_eq!(sentinel.list_batches(owner).unwrap(), vec![key.clone()]);

        // Another owner cannot touch it
        assert_eq!(sentinel.delete_batch(&key, Owner::User(10)).unwrap(), 0);
        assert!(document.exists());

        assert_eq!(sentinel.delete_batch(&key, owner).unwrap(), 1);
        assert!(!document.exists());
        assert!(sentinel.list_batches(owner).unwrap().is_empty());

        sentinel.shutdown().await;
    }

    #[test]
    fn test_remove_batch_ignores_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .create_job("123_gone.txt", Owner::User(1), "http://a.example", WEB_JOB_TYPE)
            .unwrap();

        let deleted = remove_batch(&mut storage, dir.path(), "123_gone.txt", Owner::User(1)).unwrap();
        assert_eq!(deleted, 1);
    }

    impl Sentinel {
        async fn shutdown_and_check(self, batch_key: &str, expected_jobs: u64) {
            let storage = self.storage.clone();
            self.shutdown().await;

            let storage = storage.lock().unwrap();
            let jobs = storage.get_jobs_for_batch(batch_key).unwrap();
            assert_eq!(jobs.len() as u64, expected_jobs);
            assert!(jobs.iter().all(|j| j.status == JobStatus::Failed));
        }
    }
}
