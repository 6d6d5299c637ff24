//! Response size helpers.
//!
//! Works out how many bytes a response body will carry and what the full
//! size of a ranged resource is, from `Content-Length` and `Content-Range`.

use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_RANGE};

/// Parse Content-Range header to extract total size.
///
/// Accepts both `bytes start-end/total` and `bytes */total`. An unknown total
/// (`*`) yields `None`.
///
/// # Example
///
/// ```rust
/// use trawl::utils::parse_content_range_total;
///
/// assert_eq!(parse_content_range_total("bytes 0-1023/2048"), Some(2048));
/// assert_eq!(parse_content_range_total("bytes */512"), Some(512));
/// assert_eq!(parse_content_range_total("bytes 0-1023/*"), None);
/// ```
pub fn parse_content_range_total(content_range: &str) -> Option<u64> {
    content_range
        .split('/')
        .nth(1)
        .and_then(|size| size.trim().parse::<u64>().ok())
}

/// Total resource size announced by a `Content-Range` header.
pub fn content_range_total(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range_total)
}

/// Number of body bytes a response starting at `offset` will deliver.
///
/// Prefers `Content-Length`; falls back to the `Content-Range` total minus
/// the offset.
pub fn segment_length(headers: &HeaderMap, offset: u64) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .or_else(|| content_range_total(headers).map(|total| total.saturating_sub(offset)))
}
