use url::Url;

/// Returns the last non-empty path segment of a URL
///
/// Strings that do not parse as absolute URLs are split as plain paths.
/// Returns an empty string when no segment exists.
///
/// # Examples
///
/// ```
/// use checkpoint_walker::url::extract_id;
///
/// assert_eq!(extract_id("https://example.com/lootlabs/abc123/"), "abc123");
/// assert_eq!(extract_id("relative/path/xyz"), "xyz");
/// assert_eq!(extract_id("https://example.com/"), "");
/// ```
pub fn extract_id(link: &str) -> String {
    match Url::parse(link) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or_default()
            .to_string(),
        Err(_) => link
            .split('/')
            .filter(|s| !s.is_empty())
            .last()
            .unwrap_or_default()
            .to_string(),
    }
}
