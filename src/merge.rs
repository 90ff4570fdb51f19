//! Deduplication, ranking and truncation of the unified candidate set.
//!
//! - **Key**: the normalized URL, or `"{source_label}::{title}"` when an item
//!   has no URL.
//! - **Precedence**: first-seen wins. Candidates arrive in source
//!   configuration order, then document order within a source, so the
//!   earliest configured source owns a shared story.
//! - **Ranking**: newest first; items with an unknown date go after every
//!   dated item and keep their relative input order (stable sort).
//! - **Truncation**: the first `max_items` records survive, and each excerpt
//!   is cut to [`EXCERPT_MAX_CHARS`].

use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::cmp::Ordering;
use tracing::{debug, instrument};

use crate::models::{CandidateItem, NewsRecord, iso_timestamp};
use crate::utils::{normalize_url, truncate_chars};

/// Excerpts longer than this many characters are cut with an ellipsis.
pub const EXCERPT_MAX_CHARS: usize = 300;

/// Result of a merge pass.
#[derive(Debug, Clone)]
pub struct Merged {
    pub records: Vec<NewsRecord>,
    /// Candidates left after deduplication, before truncation.
    pub unique: usize,
}

/// Identity of a candidate across sources.
pub fn dedup_key(item: &CandidateItem) -> String {
    if item.url.trim().is_empty() {
        format!("{}::{}", item.source_label, item.title)
    } else {
        normalize_url(&item.url)
    }
}

/// Newest first, unknown dates last.
fn by_recency(a: &CandidateItem, b: &CandidateItem) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Deduplicate, sort and truncate `candidates` into output records.
///
/// Unknown dates are rendered as `captured_at` in the output, but only after
/// ranking, so they still sort behind every dated item.
#[instrument(level = "info", skip_all, fields(candidates = candidates.len(), max_items = max_items))]
pub fn merge(
    candidates: Vec<CandidateItem>,
    max_items: usize,
    captured_at: DateTime<Utc>,
) -> Merged {
    let total = candidates.len();
    let mut unique: Vec<CandidateItem> = candidates.into_iter().unique_by(dedup_key).collect();
    let unique_count = unique.len();
    debug!(total, unique = unique_count, "Deduplicated candidates");

    unique.sort_by(by_recency);
    unique.truncate(max_items);

    let records = unique
        .into_iter()
        .map(|item| NewsRecord {
            id: dedup_key(&item),
            published_at: iso_timestamp(item.published_at.unwrap_or(captured_at)),
            title: item.title,
            url: item.url,
            excerpt: item
                .excerpt
                .map(|e| truncate_chars(&e, EXCERPT_MAX_CHARS))
                .unwrap_or_default(),
            image_url: item.image_url.unwrap_or_default(),
            source_label: item.source_label,
        })
        .collect();

    Merged {
        records,
        unique: unique_count,
    }
}
