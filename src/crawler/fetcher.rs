//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the workers:
//! - Building the shared HTTP client from the fetch configuration
//! - GET requests bounded by a total timeout
//! - Reading the body up to a fixed byte ceiling
//! - Hashing exactly the bytes that were read

use crate::config::FetchConfig;
use crate::SentinelError;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// Raw outcome of a successful GET
///
/// Any HTTP status counts as success here; only transport failures are errors.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status_code: u16,

    /// Body bytes, truncated at the configured ceiling
    pub body: Vec<u8>,

    /// Milliseconds from sending the request to receiving the response headers
    pub response_time_ms: u64,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sentinel::config::FetchConfig;
/// use sentinel::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and reads at most `max_body_bytes` of its body
///
/// | Condition | Result |
/// |-----------|--------|
/// | Any HTTP status (2xx, 404, 500, ...) | `Ok(FetchedPage)` |
/// | Timeout (connect, headers or body) | `Err(SentinelError::Timeout)` |
/// | Connection refused, DNS, TLS, reset | `Err(SentinelError::Fetch)` |
///
/// Bytes beyond the ceiling are discarded without error.
pub async fn fetch_page(
    client: &Client,
    url: &str,
    max_body_bytes: usize,
) -> Result<FetchedPage, SentinelError> {
    let started = Instant::now();
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;
    let response_time_ms = started.elapsed().as_millis() as u64;
    let status_code = response.status().as_u16();

    let mut body = Vec::new();
    while body.len() < max_body_bytes {
        match response.chunk().await.map_err(|e| classify_error(url, e))? {
            Some(chunk) => {
                let room = max_body_bytes - body.len();
                body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }
            None => break,
        }
    }

    tracing::trace!(
        "Fetched {} -> {} ({} bytes, {}ms)",
        url,
        status_code,
        body.len(),
        response_time_ms
    );

    Ok(FetchedPage {
        status_code,
        body,
        response_time_ms,
    })
}

fn classify_error(url: &str, error: reqwest::Error) -> SentinelError {
    if error.is_timeout() {
        SentinelError::Timeout {
            url: url.to_string(),
        }
    } else {
        SentinelError::Fetch {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Lowercase hex SHA-256 of `bytes`
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
