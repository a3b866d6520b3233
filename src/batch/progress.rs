//! Batch progress derivation
//!
//! A batch is `completed` once every one of its jobs is terminal. An empty
//! batch stays `processing`, so callers that need to tell "unknown batch"
//! apart from "still running" must look at `total` themselves.

use crate::storage::JobStore;
use crate::SentinelError;
use serde::Serialize;
use std::fmt;

/// Aggregate state of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
}

impl BatchStatus {
    /// Derives the batch status from job counts
    pub fn derive(total: u64, completed: u64, failed: u64) -> Self {
        if total > 0 && completed + failed == total {
            Self::Completed
        } else {
            Self::Processing
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress snapshot of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub status: BatchStatus,
}

impl BatchProgress {
    pub fn new(total: u64, completed: u64, failed: u64) -> Self {
        Self {
            total,
            completed,
            failed,
            status: BatchStatus::derive(total, completed, failed),
        }
    }

    /// Jobs that are neither completed nor failed yet
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.completed + self.failed)
    }

    pub fn is_complete(&self) -> bool {
        self.status == BatchStatus::Completed
    }
}

/// Loads the progress of a batch from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `batch_key` - The batch to summarize
///
/// # Returns
///
/// * `Ok(BatchProgress)` - Counts and derived status
/// * `Err(SentinelError)` - The underlying query failed
pub fn load_progress(storage: &dyn JobStore, batch_key: &str) -> Result<BatchProgress, SentinelError> {
    let (total, completed, failed) = storage.get_job_progress(batch_key)?;
    Ok(BatchProgress::new(total, completed, failed))
}

/// Prints progress to stdout in a formatted manner
pub fn print_progress(batch_key: &str, progress: &BatchProgress) {
    println!("=== Batch {} ===\n", batch_key);
    println!("  Status:    {}", progress.status);
    println!("  Total:     {}", progress.total);
    println!("  Completed: {}", progress.completed);
    println!("  Failed:    {}", progress.failed);
    println!("  Remaining: {}", progress.remaining());
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_batch_is_processing() {
        let progress = BatchProgress::new(0, 0, 0);
        assert_eq!(progress.status, BatchStatus::Processing);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_all_terminal_is_completed() {
        assert_eq!(BatchStatus::derive(3, 2, 1), BatchStatus::Completed);
        assert_eq!(BatchStatus::derive(3, 0, 3), BatchStatus::Completed);
        assert_eq!(BatchStatus::derive(3, 2, 0), BatchStatus::Processing);
    }

    #[test]
    fn test_serializes_lowercase_status() {
        let json = serde_json::to_value(BatchProgress::new(2, 2, 0)).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["total"], 2);
    }

    proptest! {
        #[test]
        fn derived_status_matches_counts(total in 0u64..500, completed in 0u64..500, failed in 0u64..500) {
            let status = BatchStatus::derive(total, completed, failed);
            let expect_done = total > 0 && completed + failed == total;
            prop_assert_eq!(status == BatchStatus::Completed, expect_done);
        }

        #[test]
        fn finished_batches_always_complete(completed in 0u64..500, failed in 0u64..500) {
            prop_assume!(completed + failed > 0);
            let progress = BatchProgress::new(completed + failed, completed, failed);
            prop_assert!(progress.is_complete());
            prop_assert_eq!(progress.remaining(), 0);
        }
    }
}
