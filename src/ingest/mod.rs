//! Ingestion: from uploaded document to queued crawl jobs
//!
//! This module covers everything between "bytes arrived" and "jobs are on
//! the queue":
//! - Detecting the document format and pulling candidate strings out of it
//! - Filtering candidates down to crawlable `http(s)` URLs
//! - Persisting the document and deriving the batch key
//! - Creating and enqueueing one job per URL in a background task

mod dispatcher;
mod extractor;
mod validator;

pub use dispatcher::{dispatch, spawn_dispatch, DispatchReport};
pub use extractor::{extract, extract_document};
pub use validator::is_crawlable;

use crate::{ExtractError, ExtractResult};
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Text,
    Csv,
    Json,
    Pdf,
}

impl DocumentFormat {
    /// Maps an extension (with or without the leading dot) to a format
    pub fn from_extension(extension: &str) -> ExtractResult<Self> {
        let normalized = extension.trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "txt" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pdf" => Ok(Self::Pdf),
            _ => Err(ExtractError::UnsupportedFormat(extension.to_string())),
        }
    }

    /// Detects the format from an uploaded file name
    pub fn from_file_name(file_name: &str) -> ExtractResult<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(extension)
    }
}

/// Turns extracted candidates into the URLs that will become jobs
///
/// Text, CSV and JSON candidates are trimmed and validated whole. A PDF page
/// is one candidate holding the page's entire text, so it is split on
/// whitespace first and every token is validated.
pub fn candidate_urls(format: DocumentFormat, candidates: &[String]) -> Vec<String> {
    match format {
        DocumentFormat::Pdf => candidates
            .iter()
            .flat_map(|page| page.split_whitespace())
            .filter(|token| is_crawlable(token))
            .map(str::to_string)
            .collect(),
        _ => candidates
            .iter()
            .map(|c| c.trim())
            .filter(|c| is_crawlable(c))
            .map(str::to_string)
            .collect(),
    }
}

/// Writes an uploaded document into `uploads_dir` and returns its batch key
///
/// The key is `<unix-seconds>_<basename>`; if that name is already taken a
/// counter is inserted (`<unix-seconds>_<n>_<basename>`) so two uploads never
/// share a key.
pub fn store_document(uploads_dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<String> {
    std::fs::create_dir_all(uploads_dir)?;

    let base = Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "upload".to_string());
    let timestamp = Utc::now().timestamp();

    let mut attempt = 0u32;
    loop {
        let batch_key = if attempt == 0 {
            format!("{}_{}", timestamp, base)
        } else {
            format!("{}_{}_{}", timestamp, attempt, base)
        };

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(uploads_dir.join(&batch_key))
        {
            Ok(mut file) => {
                file.write_all(bytes)?;
                return Ok(batch_key);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}
