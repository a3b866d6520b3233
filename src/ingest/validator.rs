use url::Url;

/// Returns true if `raw` is an absolute `http` or `https` URL
///
/// Surrounding whitespace is ignored. The authority must be written out:
/// `http:host` and `http:/host` are rejected even though a lenient parser
/// would supply the missing `//`. No normalization is applied: the candidate
/// is only accepted or rejected.
///
/// # Examples
///
/// ```
/// use sentinel::ingest::is_crawlable;
///
/// assert!(is_crawlable("  https://example.com/page \n"));
/// assert!(!is_crawlable("ftp://example.com/"));
/// assert!(!is_crawlable("/relative/path"));
/// ```
pub fn is_crawlable(raw: &str) -> bool {
    let trimmed = raw.trim();
    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => return false,
    };

    matches!(url.scheme(), "http" | "https")
        && url.has_host()
        && has_written_authority(trimmed, url.scheme())
}

/// True if `://` directly follows the scheme in the input as written
fn has_written_authority(input: &str, scheme: &str) -> bool {
    input
        .get(scheme.len()..)
        .map_or(false, |rest| rest.starts_with("://"))
}
