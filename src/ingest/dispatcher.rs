//! Job dispatcher: validated URLs to persisted, queued jobs
//!
//! Each URL is an independent unit: a failure to create or enqueue one job
//! is logged and counted, and the remaining URLs carry on.

use crate::crawler::{JobQueue, QueuedJob};
use crate::state::{JobStatus, Owner};
use crate::storage::{lock_storage, JobStore, SharedStorage, StorageResult, WEB_JOB_TYPE};
use serde::Serialize;
use tokio::task::JoinHandle;

/// Outcome of dispatching one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Candidate strings extracted from the document
    pub candidates: usize,

    /// Candidates that passed URL validation
    pub valid: usize,

    /// Jobs created and handed to the queue
    pub enqueued: usize,

    /// URLs whose job could not be created or enqueued
    pub failed: usize,
}

/// Creates a `pending` job for every URL and enqueues it
///
/// Enqueueing waits while the queue is full. If the queue has been closed the
/// freshly created job is marked `failed` so it does not sit in `pending`.
pub async fn dispatch(
    storage: &SharedStorage,
    queue: &JobQueue,
    batch_key: &str,
    owner: Owner,
    candidates: usize,
    urls: &[String],
) -> DispatchReport {
    let mut report = DispatchReport {
        candidates,
        valid: urls.len(),
        ..DispatchReport::default()
    };

    for url in urls {
        let job_id = match create_job(storage, batch_key, owner, url) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Failed to create job for {}: {}", url, e);
                report.failed += 1;
                continue;
            }
        };

        let job = QueuedJob {
            id: job_id,
            url: url.clone(),
            batch_key: batch_key.to_string(),
        };

        if let Err(e) = queue.enqueue(job).await {
            tracing::error!("Failed to enqueue job {} ({}): {}", job_id, url, e);
            report.failed += 1;
            if let Err(e) = lock_storage(storage)
                .and_then(|mut storage| storage.update_job_status(job_id, JobStatus::Failed))
            {
                tracing::warn!("Job {} left pending: {}", job_id, e);
            }
            continue;
        }

        tracing::trace!("Enqueued job {} for {}", job_id, url);
        report.enqueued += 1;
    }

    tracing::info!(
        "Dispatched batch {}: {} candidates, {} valid, {} enqueued, {} failed",
        batch_key,
        report.candidates,
        report.valid,
        report.enqueued,
        report.failed
    );

    report
}

/// Runs [`dispatch`] on a background task
pub fn spawn_dispatch(
    storage: SharedStorage,
    queue: JobQueue,
    batch_key: String,
    owner: Owner,
    candidates: usize,
    urls: Vec<String>,
) -> JoinHandle<DispatchReport> {
    tokio::spawn(async move {
        dispatch(&storage, &queue, &batch_key, owner, candidates, &urls).await
    })
}

fn create_job(
    storage: &SharedStorage,
    batch_key: &str,
    owner: Owner,
    url: &str,
) -> StorageResult<i64> {
    let mut storage = lock_storage(storage)?;
    storage.create_job(batch_key, owner, url, WEB_JOB_TYPE)
}
