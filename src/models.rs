//! Data models flowing through the harvesting pipeline.
//!
//! - [`SourceSpec`] / [`SourceKind`]: one configured fetch target
//! - [`CandidateItem`]: a parsed, not-yet-merged entry from one source
//! - [`NewsRecord`]: the persisted, ranked output record
//! - [`SourceReport`] / [`Diagnostics`]: per-run bookkeeping for the
//!   diagnostics snapshot
//!
//! Output models serialize with camelCase field names because the JSON file
//! is consumed by a web front end.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// What kind of provider a source is; decides parser and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Video-platform channel or uploads Atom feed.
    VideoChannel,
    /// Audio-marketplace RSS/Atom feed.
    MarketplaceFeed,
    /// Audio-marketplace HTML catalog page.
    MarketplaceCatalog,
    /// Curated press RSS feed.
    Press,
    /// Broad news-search RSS feed.
    NewsSearch,
}

impl SourceKind {
    /// Trusted sources skip the relevance filter: their provenance alone
    /// guarantees the item is about the subject.
    pub fn is_trusted(self) -> bool {
        matches!(
            self,
            SourceKind::VideoChannel | SourceKind::MarketplaceFeed | SourceKind::MarketplaceCatalog
        )
    }
}

/// One concrete fetch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub label: String,
    pub kind: SourceKind,
    pub url: String,
}

/// A parsed entry from one source, before filtering and merging.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateItem {
    pub title: String,
    pub url: String,
    /// `None` when the source carries no usable date (catalog tiles past the
    /// detail-fetch cap, failed detail fetches).
    pub published_at: Option<DateTime<Utc>>,
    /// Full markup-stripped description; cut for display only when the
    /// record is built.
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub source_label: String,
    /// Site the story is attributed to, when the feed names one
    /// (news-search `<source url="...">`). Only used to resolve the host.
    pub publisher_url: Option<String>,
}

impl CandidateItem {
    /// Concatenated title and excerpt, the text the relevance rules run on.
    pub fn text(&self) -> String {
        match &self.excerpt {
            Some(excerpt) => format!("{} {}", self.title, excerpt),
            None => self.title.clone(),
        }
    }
}

/// A persisted news record.
///
/// Field order matches the output schema; every field is always present,
/// with empty strings standing in for missing values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsRecord {
    /// Derived from the normalized URL.
    pub id: String,
    pub title: String,
    pub url: String,
    /// ISO-8601 UTC with millisecond precision.
    pub published_at: String,
    pub excerpt: String,
    pub image_url: String,
    pub source_label: String,
}

/// Format a timestamp the way the output schema expects it.
pub fn iso_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Outcome of harvesting one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Failed { error: String },
}

/// Per-source bookkeeping kept for the diagnostics snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub label: String,
    pub kind: SourceKind,
    pub url: String,
    #[serde(flatten)]
    pub status: SourceStatus,
    /// Candidates the parser produced.
    pub parsed: usize,
    /// Candidates left after the relevance filter.
    pub kept: usize,
}

/// Diagnostics snapshot written next to the output file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub captured_at: String,
    pub sources: Vec<SourceReport>,
    /// Candidates remaining after deduplication, before truncation.
    pub merged: usize,
    pub output: usize,
    pub sample: Vec<NewsRecord>,
}
