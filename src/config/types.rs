use serde::Deserialize;

/// Main configuration structure for Sentinel
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Number of long-lived crawl workers
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Capacity of the bounded job queue; producers block once it is full
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: u32,
}

/// Per-fetch limits applied by every worker
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Total deadline for one GET request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Response bodies are truncated to this many bytes
    #[serde(rename = "max-body-bytes", default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Where jobs, results and uploaded documents live
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Directory uploaded documents are copied into
    #[serde(rename = "uploads-dir", default = "default_uploads_dir")]
    pub uploads_dir: String,
}

/// Per-owner quotas
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum distinct batches a registered owner may keep (0 = unlimited)
    #[serde(rename = "max-batches-per-owner", default = "default_max_batches")]
    pub max_batches_per_owner: u32,
}

fn default_workers() -> u32 {
    100
}

fn default_queue_capacity() -> u32 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_user_agent() -> String {
    format!("sentinel/{}", env!("CARGO_PKG_VERSION"))
}

fn default_database_path() -> String {
    "./sentinel.db".to_string()
}

fn default_uploads_dir() -> String {
    "./uploads".to_string()
}

fn default_max_batches() -> u32 {
    10
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_batches_per_owner: default_max_batches(),
        }
    }
}
