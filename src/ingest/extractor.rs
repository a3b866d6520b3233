//! Candidate extraction from uploaded documents
//!
//! Extraction is a pure transform over bytes: it never touches the network,
//! the job store or the queue.

use crate::ingest::DocumentFormat;
use crate::{ExtractError, ExtractResult};

/// Extracts candidate strings from a document with the declared extension
///
/// | Format | One candidate per |
/// |--------|-------------------|
/// | `.txt` | line, in file order, untrimmed |
/// | `.csv` | row, first column only |
/// | `.json` | element of a top-level array of strings |
/// | `.pdf` | page (the page's whole text) |
///
/// # Arguments
///
/// * `bytes` - Raw document content
/// * `declared_extension` - Extension such as `".txt"` or `"csv"` (case-insensitive)
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Candidates in document order
/// * `Err(ExtractError)` - Unsupported or malformed document
///
/// # Example
///
/// ```
/// use sentinel::ingest::extract;
///
/// let candidates = extract(b"https://a.example\nnot-a-url\n", ".txt").unwrap();
/// assert_eq!(candidates, vec!["https://a.example", "not-a-url"]);
/// ```
pub fn extract(bytes: &[u8], declared_extension: &str) -> ExtractResult<Vec<String>> {
    let format = DocumentFormat::from_extension(declared_extension)?;
    extract_document(bytes, format)
}

/// Extracts candidates from a document whose format is already known
pub fn extract_document(bytes: &[u8], format: DocumentFormat) -> ExtractResult<Vec<String>> {
    match format {
        DocumentFormat::Text => Ok(extract_lines(bytes)),
        DocumentFormat::Csv => extract_csv(bytes),
        DocumentFormat::Json => extract_json(bytes),
        DocumentFormat::Pdf => extract_pdf(bytes),
    }
}

/// One candidate per line; `\r\n` endings are accepted and a trailing newline
/// does not produce an empty candidate
fn extract_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

/// First column of every row; rows with a differing field count are an error
fn extract_csv(bytes: &[u8]) -> ExtractResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(bytes);

    let mut candidates = Vec::new();
    for record in reader.records() {
        let record = record?;
        candidates.push(record.get(0).unwrap_or_default().to_string());
    }

    Ok(candidates)
}

fn extract_json(bytes: &[u8]) -> ExtractResult<Vec<String>> {
    Ok(serde_json::from_slice::<Vec<String>>(bytes)?)
}

fn extract_pdf(bytes: &[u8]) -> ExtractResult<Vec<String>> {
    let document =
        lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    // get_pages is keyed by 1-based page number, so iteration is in page order
    for page_number in document.get_pages().keys() {
        let text = document
            .extract_text(&[*page_number])
            .map_err(|e| ExtractError::PdfPage {
                page: *page_number,
                message: e.to_string(),
            })?;
        pages.push(text);
    }

    Ok(pages)
}
