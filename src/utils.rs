//! Utility functions for timestamps, URLs and string truncation.
//!
//! - Lenient timestamp parsing for the date formats feeds actually emit
//! - URL normalization (dedup keys) and host resolution (trusted hosts)
//! - Char-boundary-safe truncation for excerpts and log previews

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use url::Url;

/// Parse a feed timestamp into UTC.
///
/// Tries, in order: RFC 3339 (Atom, JSON-LD), RFC 2822 (RSS `pubDate`),
/// the `14 Mar 2024 00:00:00 GMT` form marketplace pages use, a naive
/// `YYYY-MM-DD HH:MM:SS`, and a bare `YYYY-MM-DD` (midnight UTC).
///
/// # Returns
///
/// `None` when no format matches; the caller decides the default.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let without_zone = raw
        .trim_end_matches(" GMT")
        .trim_end_matches(" UTC")
        .trim_end_matches('Z');
    for fmt in ["%d %b %Y %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(without_zone, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Normalize a URL for use as a deduplication key.
///
/// Drops the fragment and `utm_*` tracking parameters, strips a trailing `/`
/// from non-root paths and lowercases scheme and host. Strings that do not
/// parse as absolute URLs are only trimmed.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }
    url.to_string()
}

/// Host of `raw` without a leading `www.`, lowercased.
pub fn host_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

/// Truncate `s` to at most `max` characters, appending `…` when cut.
///
/// Used for excerpts, where splitting inside a multi-byte character would
/// produce invalid output.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}…", s[..idx].trim_end()),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with the number of dropped bytes
/// appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 14, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-14T10:00:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-14T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("Thu, 14 Mar 2024 10:00:00 GMT"), Some(expected));
        assert_eq!(parse_timestamp("Thu, 14 Mar 2024 10:00:00 +0000"), Some(expected));
        assert_eq!(parse_timestamp("14 Mar 2024 10:00:00 GMT"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-14 10:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-14"),
            Some(Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("HTTPS://Example.COM/news/story/?utm_source=rss&id=7#top"),
            "https://example.com/news/story?id=7"
        );
        assert_eq!(
            normalize_url("https://example.com/a/?utm_medium=x"),
            "https://example.com/a"
        );
        assert_eq!(normalize_url("https://example.com/"), "https://example.com/");
        assert_eq!(normalize_url("  not a url "), "not a url");
    }

    #[test]
    fn test_host_of_strips_www() {
        assert_eq!(
            host_of("https://www.Kerrang.com/news"),
            Some("kerrang.com".to_string())
        );
        assert_eq!(
            host_of("https://news.google.com/rss/articles/x"),
            Some("news.google.com".to_string())
        );
        assert_eq!(host_of("relative/path"), None);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo…");
        assert_eq!(truncate_chars("ab cd", 3), "ab…");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }
}
