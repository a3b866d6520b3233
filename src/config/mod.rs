//! Configuration module for Sentinel
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sentinel::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sentinel.toml")).unwrap();
//! println!("Queue capacity: {}", config.pool.queue_capacity);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetchConfig, LimitsConfig, PoolConfig, StorageConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
