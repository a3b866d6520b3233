//! Sentinel: document-driven batch web crawler
//!
//! This crate turns an uploaded document (text, CSV, JSON array or PDF) into a
//! batch of crawl jobs, runs them on a bounded worker pool, and aggregates the
//! stored results per batch.

pub mod batch;
pub mod config;
pub mod crawler;
pub mod ingest;
pub mod service;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Sentinel operations
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job queue is closed")]
    QueueClosed,

    #[error("Batch limit reached (max {limit}); delete an existing batch first")]
    BatchLimitReached { limit: u32 },

    #[error("Guests cannot perform this operation")]
    GuestForbidden,

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while pulling candidate URLs out of a document
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("malformed csv document: {0}")]
    Csv(#[from] csv::Error),

    #[error("document is not a JSON array of strings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unreadable pdf document: {0}")]
    Pdf(String),

    #[error("error reading pdf page {page}: {message}")]
    PdfPage { page: u32, message: String },
}

/// Result type alias for Sentinel operations
pub type Result<T> = std::result::Result<T, SentinelError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for document extraction
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

// Re-export commonly used types
pub use batch::{BatchMetrics, BatchProgress, BatchStatus};
pub use config::Config;
pub use ingest::{extract, is_crawlable, DocumentFormat};
pub use service::{Sentinel, Submission};
pub use state::{JobStatus, Owner};
pub use storage::{CrawlData, JobRecord};
