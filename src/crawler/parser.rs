//! HTML parser for extracting crawl signals
//!
//! This module handles parsing a fetched body to extract:
//! - Text of the first `<title>` and first `<h1>`
//! - The `content` of `<meta name="description">`
//! - Every anchor `href`, as written in the document

use scraper::{Html, Selector};

/// Signals extracted from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSignals {
    /// Text content of the first `<title>`, empty if absent
    pub title: String,

    /// Text content of the first `<h1>`, empty if absent
    pub h1: String,

    /// Meta description content, empty if absent
    pub meta_description: String,

    /// Raw `href` values in document order, duplicates kept
    pub links: Vec<String>,
}

/// Parses a response body and extracts page signals
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected, and the
/// HTML parser recovers from malformed markup, so in practice only a selector
/// failure produces an error.
///
/// # Arguments
///
/// * `body` - The response body, possibly truncated
///
/// # Returns
///
/// * `Ok(PageSignals)` - Successfully parsed page
/// * `Err(String)` - Failed to parse HTML
///
/// # Example
///
/// ```
/// use sentinel::crawler::parse_page;
///
/// let html = br#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let signals = parse_page(html).unwrap();
/// assert_eq!(signals.title, "Test");
/// assert_eq!(signals.links, vec!["/page"]);
/// ```
pub fn parse_page(body: &[u8]) -> Result<PageSignals, String> {
    let html = String::from_utf8_lossy(body);
    let document = Html::parse_document(&html);

    Ok(PageSignals {
        title: first_text(&document, "title")?,
        h1: first_text(&document, "h1")?,
        meta_description: meta_description(&document)?,
        links: extract_links(&document)?,
    })
}

fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector {}: {}", css, e))
}

/// Text content of the first element matching `css`
fn first_text(document: &Html, css: &str) -> Result<String, String> {
    let selector = selector(css)?;
    Ok(document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>())
        .unwrap_or_default())
}

fn meta_description(document: &Html) -> Result<String, String> {
    let selector = selector("meta[name='description']")?;
    Ok(document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .unwrap_or_default()
        .to_string())
}

fn extract_links(document: &Html) -> Result<Vec<String>, String> {
    let selector = selector("a[href]")?;
    Ok(document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect())
}
