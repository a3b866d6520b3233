//! Storage traits and error types
//!
//! This module defines the trait interface for the job/result store and
//! associated error types.

use crate::batch::BatchMetrics;
use crate::state::{JobStatus, Owner};
use crate::storage::{CrawlData, JobRecord, ResultRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for job/result storage backends
///
/// Jobs are grouped by `batch_key`; deletion and listing are additionally
/// scoped by owner.
pub trait JobStore {
    // ===== Job Management =====

    /// Creates a new job in the `pending` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created job
    fn create_job(
        &mut self,
        batch_key: &str,
        owner: Owner,
        url: &str,
        job_type: &str,
    ) -> StorageResult<i64>;

    /// Gets a job by ID
    fn get_job(&self, job_id: i64) -> StorageResult<JobRecord>;

    /// Moves a job to `status`
    ///
    /// Fails with `InvalidTransition` if the move would not be monotonic and
    /// with `JobNotFound` if the job no longer exists.
    fn update_job_status(&mut self, job_id: i64, status: JobStatus) -> StorageResult<()>;

    /// Gets every job of a batch, in creation order
    fn get_jobs_for_batch(&self, batch_key: &str) -> StorageResult<Vec<JobRecord>>;

    // ===== Result Management =====

    /// Stores the crawl output of a job
    ///
    /// # Returns
    ///
    /// The ID of the result row
    fn insert_result(&mut self, job_id: i64, data: &CrawlData) -> StorageResult<i64>;

    /// Gets the result of a job, if it has one
    fn get_result_for_job(&self, job_id: i64) -> StorageResult<Option<ResultRecord>>;

    // ===== Batch Queries =====

    /// Counts `(total, completed, failed)` jobs in a batch
    fn get_job_progress(&self, batch_key: &str) -> StorageResult<(u64, u64, u64)>;

    /// Gets every stored crawl payload for a batch
    fn get_job_results(&self, batch_key: &str) -> StorageResult<Vec<CrawlData>>;

    /// Aggregates request count, latency, payload size and status codes
    fn get_job_metrics(&self, batch_key: &str) -> StorageResult<BatchMetrics>;

    /// Lists the distinct batch keys owned by `owner`, newest first
    fn list_batches(&self, owner: Owner) -> StorageResult<Vec<String>>;

    /// Counts the distinct batches owned by `owner`
    fn count_batches(&self, owner: Owner) -> StorageResult<u64>;

    /// Deletes every job (and, by cascade, result) of a batch owned by `owner`
    ///
    /// # Returns
    ///
    /// The number of jobs removed
    fn delete_batch(&mut self, batch_key: &str, owner: Owner) -> StorageResult<u64>;
}
