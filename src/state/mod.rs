//! State module for tracking job progress
//!
//! # Components
//!
//! - `JobStatus`: the closed set of states a crawl job moves through
//! - `Owner`: the principal (registered user or guest) a batch belongs to

mod job_status;
mod owner;

// Re-export main types
pub use job_status::JobStatus;
pub use owner::Owner;
