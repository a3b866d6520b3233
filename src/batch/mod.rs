//! Batch aggregation
//!
//! Reads job state back out of storage to answer, per batch key:
//! - how far along the batch is (`progress`)
//! - what the crawl looked like in aggregate (`metrics`)

mod metrics;
mod progress;

pub use metrics::{load_metrics, print_metrics, BatchMetrics};
pub use progress::{load_progress, print_progress, BatchProgress, BatchStatus};
