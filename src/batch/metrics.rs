//! Per-batch crawl metrics

use crate::storage::JobStore;
use crate::SentinelError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated metrics over every stored result of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchMetrics {
    /// Number of results (successful fetches) in the batch
    pub total_requests: u64,

    /// Mean response time in milliseconds, 0 when there are no results
    pub avg_response_time: f64,

    /// HTTP status code (as a string) -> number of results
    pub status_codes: BTreeMap<String, u64>,

    /// Sum of the serialized payload sizes in bytes
    pub total_data_size: u64,
}

impl BatchMetrics {
    /// Number of results that received a 2xx response
    pub fn success_count(&self) -> u64 {
        self.status_codes
            .iter()
            .filter(|(code, _)| code.starts_with('2'))
            .map(|(_, count)| count)
            .sum()
    }
}

/// Loads the metrics of a batch from storage
pub fn load_metrics(storage: &dyn JobStore, batch_key: &str) -> Result<BatchMetrics, SentinelError> {
    Ok(storage.get_job_metrics(batch_key)?)
}

/// Prints metrics to stdout in a formatted manner
pub fn print_metrics(batch_key: &str, metrics: &BatchMetrics) {
    println!("=== Metrics for {} ===\n", batch_key);
    println!("  Requests:          {}", metrics.total_requests);
    println!("  Successful (2xx):  {}", metrics.success_count());
    println!("  Avg response time: {:.1}ms", metrics.avg_response_time);
    println!("  Total data size:   {} bytes", metrics.total_data_size);

    if !metrics.status_codes.is_empty() {
        println!("\nStatus Codes:");
        let mut codes: Vec<_> = metrics.status_codes.iter().collect();
        codes.sort_by(|a, b| b.1.cmp(a.1));
        for (code, count) in codes {
            println!("  {}: {}", code, count);
        }
    }
}
