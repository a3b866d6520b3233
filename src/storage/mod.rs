//! Storage module for persisting jobs and crawl results
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Job creation and guarded status updates
//! - Result persistence
//! - Batch-scoped queries (progress, results, metrics, listing, deletion)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{lock_storage, SharedStorage, SqliteStorage};
pub use traits::{JobStore, StorageError, StorageResult};

use crate::state::{JobStatus, Owner};
use serde::{Deserialize, Serialize};

/// Job type tag for plain page fetches
pub const WEB_JOB_TYPE: &str = "web";

/// Represents a job in the database
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: i64,
    pub owner: Owner,
    pub url: String,
    pub batch_key: String,
    pub job_type: String,
    pub status: JobStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Represents a stored crawl result
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub id: i64,
    pub job_id: i64,
    pub data: CrawlData,
    pub created_at: String,
}

/// Signals extracted from one fetched page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlData {
    pub url: String,
    pub status_code: u16,
    #[serde(rename = "response_time")]
    pub response_time_ms: u64,
    /// Lowercase hex SHA-256 of the bytes actually read
    pub content_hash: String,
    pub title: String,
    pub h1: String,
    pub meta_description: String,
    /// Raw `href` values in document order, duplicates kept
    #[serde(default)]
    pub links: Vec<String>,
}
