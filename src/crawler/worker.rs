//! Per-job processing
//!
//! A [`JobProcessor`] drives one job from `pending` to a terminal status.
//! Every failure is contained here: it is logged, the job is marked
//! `failed`, and the worker moves on to the next job.

use crate::config::FetchConfig;
use crate::crawler::fetcher::{build_http_client, content_hash, fetch_page, FetchedPage};
use crate::crawler::parser::parse_page;
use crate::crawler::policy::{NoRetry, RetryPolicy};
use crate::crawler::pool::QueuedJob;
use crate::state::JobStatus;
use crate::storage::{lock_storage, CrawlData, JobStore, SharedStorage, StorageError};
use crate::SentinelError;
use reqwest::Client;
use std::sync::Arc;

/// Fetches, parses and persists queued jobs
pub struct JobProcessor {
    client: Client,
    storage: SharedStorage,
    fetch: FetchConfig,
    retry: Arc<dyn RetryPolicy>,
}

impl JobProcessor {
    /// Creates a processor that never retries
    pub fn new(fetch: FetchConfig, storage: SharedStorage) -> Result<Self, SentinelError> {
        let client = build_http_client(&fetch)?;
        Ok(Self {
            client,
            storage,
            fetch,
            retry: Arc::new(NoRetry),
        })
    }

    /// Replaces the retry policy
    pub fn with_retry_policy(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    /// Processes one job to completion
    ///
    /// Returns the terminal status that was recorded, or `None` when the job
    /// was not claimed (deleted, or already past `pending`).
    pub async fn process(&self, job: &QueuedJob) -> Option<JobStatus> {
        if let Err(e) = self.set_status(job.id, JobStatus::Processing) {
            match e {
                StorageError::JobNotFound(_) | StorageError::InvalidTransition { .. } => {
                    tracing::debug!("Skipping job {} ({}): {}", job.id, job.url, e);
                }
                _ => tracing::error!("Failed to claim job {} ({}): {}", job.id, job.url, e),
            }
            return None;
        }

        tracing::info!("Job {} started ({}): {}", job.id, job.batch_key, job.url);

        let status = match self.crawl(job).await {
            Ok(data) => {
                tracing::info!(
                    "Job {} completed: {} -> {} in {}ms",
                    job.id,
                    job.url,
                    data.status_code,
                    data.response_time_ms
                );
                JobStatus::Completed
            }
            Err(e) => {
                tracing::warn!("Job {} failed: {}", job.id, e);
                JobStatus::Failed
            }
        };

        // Best effort: if this write fails the job stays in processing
        if let Err(e) = self.set_status(job.id, status) {
            tracing::error!(
                "Failed to mark job {} as {}: {}",
                job.id,
                status.to_db_string(),
                e
            );
        }

        Some(status)
    }

    /// Fetch, hash, parse and persist; the first failing step aborts
    async fn crawl(&self, job: &QueuedJob) -> Result<CrawlData, SentinelError> {
        let page = self.fetch_with_retry(&job.url).await?;
        let signals = parse_page(&page.body).map_err(|message| SentinelError::HtmlParse {
            url: job.url.clone(),
            message,
        })?;

        let data = CrawlData {
            url: job.url.clone(),
            status_code: page.status_code,
            response_time_ms: page.response_time_ms,
            content_hash: content_hash(&page.body),
            title: signals.title,
            h1: signals.h1,
            meta_description: signals.meta_description,
            links: signals.links,
        };

        {
            let mut storage = lock_storage(&self.storage)?;
            storage.insert_result(job.id, &data)?;
        }

        Ok(data)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<FetchedPage, SentinelError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match fetch_page(&self.client, url, self.fetch.max_body_bytes).await {
                Ok(page) => return Ok(page),
                Err(e) => match self.retry.retry_after(attempt, &e) {
                    Some(delay) => {
                        tracing::debug!("Retrying {} after {:?} (attempt {}): {}", url, delay, attempt, e);
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
            }
        }
    }

    fn set_status(&self, job_id: i64, status: JobStatus) -> Result<(), StorageError> {
        let mut storage = lock_storage(&self.storage)?;
        storage.update_job_status(job_id, status)
    }
}
