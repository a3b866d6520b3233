//! Crawler module for job fetching and processing
//!
//! This module contains the worker side of the pipeline, including:
//! - HTTP fetching with a total timeout and a body ceiling
//! - HTML signal extraction
//! - The retry decision seam (no retries by default)
//! - The bounded job queue and the worker pool draining it

mod fetcher;
mod parser;
mod policy;
mod pool;
mod worker;

pub use fetcher::{build_http_client, content_hash, fetch_page, FetchedPage};
pub use parser::{parse_page, PageSignals};
pub use policy::{FixedRetry, NoRetry, RetryPolicy};
pub use pool::{JobQueue, QueuedJob, WorkerPool};
pub use worker::JobProcessor;
