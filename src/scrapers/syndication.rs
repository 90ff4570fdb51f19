//! RSS 2.0 / Atom parsing.
//!
//! The document is never parsed as a whole. It is split into repeated unit
//! blocks (`<entry>` for Atom, `<item>` for RSS) and each block is handed to
//! the [`crate::extract`] primitives independently, so one malformed unit
//! costs exactly one candidate.
//!
//! # Field Mapping
//!
//! | Field | Atom | RSS |
//! |-------|------|-----|
//! | title | `title` | `title` |
//! | link | `link[rel=alternate]@href`, else first `link@href` | `link`, else permalink `guid` |
//! | date | `published`, `updated` | `pubDate`, `dc:date` |
//! | excerpt | `summary`, `content`, `media:description` | `description`, `content:encoded`, `media:description` |
//! | image | `media:thumbnail@url`, `media:content@url`, `enclosure[type=image/*]@url` | same |
//!
//! Units whose date is missing or unparsable are stamped with the capture time.
//! Excerpts keep the whole description so the relevance filter sees all of
//! it; they are cut to display length when records are built.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};
use url::Url;

use crate::extract::{first_attr, first_tag_inner, first_tag_text, text_content};
use crate::models::CandidateItem;
use crate::utils::parse_timestamp;

static ATOM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<feed[\s>]").unwrap());
static ENTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<entry[\s>].*?</entry\s*>").unwrap());
static ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<item[\s>].*?</item\s*>").unwrap());

const ALTERNATE_LINK: &str = r#"link\b[^>]*\brel\s*=\s*["']alternate["']"#;
const IMAGE_ENCLOSURE: &str = r#"enclosure\b[^>]*\btype\s*=\s*["']image/"#;

/// Feed dialect, decided by the presence of a `<feed>` wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Atom,
    Rss,
}

pub fn detect_dialect(raw: &str) -> Dialect {
    if ATOM_RE.is_match(raw) {
        Dialect::Atom
    } else {
        Dialect::Rss
    }
}

/// Parse raw RSS/Atom text into candidates, preserving document order.
///
/// # Arguments
///
/// * `raw` - The feed body; an empty string yields no candidates
/// * `source_label` - Label stamped on every candidate
/// * `captured_at` - Default timestamp for units without a usable date
#[instrument(level = "debug", skip(raw, captured_at), fields(bytes = raw.len()))]
pub fn parse_feed(raw: &str, source_label: &str, captured_at: DateTime<Utc>) -> Vec<CandidateItem> {
    let dialect = detect_dialect(raw);
    let unit_re = match dialect {
        Dialect::Atom => &*ENTRY_RE,
        Dialect::Rss => &*ITEM_RE,
    };

    let mut out = Vec::new();
    let mut dropped = 0usize;
    for unit in unit_re.find_iter(raw) {
        match parse_unit(unit.as_str(), dialect, source_label, captured_at) {
            Some(item) => out.push(item),
            None => dropped += 1,
        }
    }

    debug!(?dialect, parsed = out.len(), dropped, "Parsed feed");
    out
}

fn parse_unit(
    unit: &str,
    dialect: Dialect,
    source_label: &str,
    captured_at: DateTime<Utc>,
) -> Option<CandidateItem> {
    let title = text_content(&first_tag_inner(unit, &["title"]));
    let link = match dialect {
        Dialect::Atom => {
            let alternate = first_attr(unit, ALTERNATE_LINK, "href");
            if alternate.is_empty() {
                first_attr(unit, r"link\b", "href")
            } else {
                alternate
            }
        }
        Dialect::Rss => {
            let link = first_tag_text(unit, &["link"]);
            if link.is_empty() {
                let guid = first_tag_text(unit, &["guid"]);
                if guid.starts_with("http://") || guid.starts_with("https://") {
                    guid
                } else {
                    String::new()
                }
            } else {
                link
            }
        }
    };

    if title.is_empty() || link.is_empty() {
        debug!(%title, %link, "Dropping unit without title or link");
        return None;
    }

    let date_tags: &[&str] = match dialect {
        Dialect::Atom => &["published", "updated"],
        Dialect::Rss => &["pubDate", "dc:date"],
    };
    let published_at = parse_timestamp(&first_tag_text(unit, date_tags)).unwrap_or(captured_at);

    let excerpt_tags: &[&str] = match dialect {
        Dialect::Atom => &["summary", "content", "media:description"],
        Dialect::Rss => &["description", "content:encoded", "media:description"],
    };
    let excerpt = text_content(&first_tag_inner(unit, excerpt_tags));
    let excerpt = (!excerpt.is_empty()).then_some(excerpt);

    let (publisher_url, source_label) = match dialect {
        Dialect::Rss => {
            let publisher_url = first_attr(unit, r"source\b", "url");
            let publisher_name = first_tag_text(unit, &["source"]);
            let label = if publisher_name.is_empty() {
                source_label.to_string()
            } else {
                publisher_name
            };
            ((!publisher_url.is_empty()).then_some(publisher_url), label)
        }
        Dialect::Atom => (None, source_label.to_string()),
    };

    Some(CandidateItem {
        title,
        url: canonical_video_link(&link),
        published_at: Some(published_at),
        excerpt,
        image_url: first_image(unit),
        source_label,
        publisher_url,
    })
}

fn first_image(unit: &str) -> Option<String> {
    [
        first_attr(unit, r"media:thumbnail\b", "url"),
        first_attr(unit, r"media:content\b", "url"),
        first_attr(unit, IMAGE_ENCLOSURE, "url"),
    ]
    .into_iter()
    .find(|u| !u.is_empty())
}

/// Rewrite short video links (`youtu.be/<id>`, `youtube.com/shorts/<id>`) to
/// the canonical watch page. Any other link is returned unchanged.
pub fn canonical_video_link(link: &str) -> String {
    let Ok(url) = Url::parse(link) else {
        return link.to_string();
    };
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let host = host.trim_start_matches("www.").trim_start_matches("m.");

    let mut segments = url.path_segments().into_iter().flatten();
    let id = match host {
        "youtu.be" => segments.next(),
        "youtube.com" => match segments.next() {
            Some("shorts") => segments.next(),
            _ => None,
        },
        _ => None,
    };

    match id.filter(|id| !id.is_empty()) {
        Some(id) => format!("https://www.youtube.com/watch?v={id}"),
        None => link.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn captured() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    const YOUTUBE_ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <link rel="self" href="http://www.youtube.com/feeds/videos.xml?channel_id=UCxyz"/>
 <title>OSIAH</title>
 <entry>
  <id>yt:video:abc123</id>
  <title>OSIAH - Loathe (Official Video)</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=abc123"/>
  <published>2024-05-01T17:00:00+00:00</published>
  <updated>2024-05-02T09:00:00+00:00</updated>
  <media:group>
   <media:title>OSIAH - Loathe (Official Video)</media:title>
   <media:content url="https://www.youtube.com/v/abc123?version=3" type="application/x-shockwave-flash"/>
   <media:thumbnail url="https://i1.ytimg.com/vi/abc123/hqdefault.jpg" width="480" height="360"/>
   <media:description>New single &amp; video out now</media:description>
  </media:group>
 </entry>
 <entry>
  <title>Short teaser</title>
  <link href="https://youtu.be/short99"/>
 </entry>
 <entry>
  <title></title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=notitle"/>
 </entry>
</feed>"#;

    const PRESS_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
 <title>Metal Press</title>
 <item>
  <title><![CDATA[OSIAH announce UK tour]]></title>
  <link>https://press.example/osiah-tour/</link>
  <pubDate>Thu, 14 Mar 2024 10:00:00 GMT</pubDate>
  <description><![CDATA[<p>The deathcore band <b>OSIAH</b> hit the road.</p>]]></description>
  <enclosure url="https://press.example/img/tour.jpg" type="image/jpeg" length="1234"/>
 </item>
 <item>
  <title>Broken unit
  <link>https://press.example/broken</link>
 </item>
 <item>
  <title>Permalink only</title>
  <guid isPermaLink="true">https://press.example/p/42</guid>
  <pubDate>not a date</pubDate>
 </item>
 <item>
  <title>OSIAH in the news</title>
  <link>https://news.google.com/rss/articles/CBMi</link>
  <source url="https://www.kerrang.com">Kerrang!</source>
 </item>
</channel>
</rss>"#;

    #[test]
    fn test_detects_dialect() {
        assert_eq!(detect_dialect(YOUTUBE_ATOM), Dialect::Atom);
        assert_eq!(detect_dialect(PRESS_RSS), Dialect::Rss);
    }

    #[test]
    fn test_parses_youtube_atom() {
        let items = parse_feed(YOUTUBE_ATOM, "YouTube", captured());
        assert_eq!(items.len(), 2, "entry without title must be dropped");

        let first = &items[0];
        assert_eq!(first.title, "OSIAH - Loathe (Official Video)");
        assert_eq!(first.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 17, 0, 0).unwrap())
        );
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://i1.ytimg.com/vi/abc123/hqdefault.jpg")
        );
        assert_eq!(first.excerpt.as_deref(), Some("New single & video out now"));
        assert_eq!(first.source_label, "YouTube");
    }

    #[test]
    fn test_atom_link_without_rel_and_short_link_rewrite() {
        let items = parse_feed(YOUTUBE_ATOM, "YouTube", captured());
        assert_eq!(items[1].url, "https://www.youtube.com/watch?v=short99");
        assert_eq!(items[1].published_at, Some(captured()));
        assert_eq!(items[1].excerpt, None);
    }

    #[test]
    fn test_parses_rss_with_cdata_and_enclosure() {
        let items = parse_feed(PRESS_RSS, "Metal Press", captured());
        let tour = &items[0];
        assert_eq!(tour.title, "OSIAH announce UK tour");
        assert_eq!(tour.url, "https://press.example/osiah-tour/");
        assert_eq!(
            tour.published_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 14, 10, 0, 0).unwrap())
        );
        assert_eq!(
            tour.excerpt.as_deref(),
            Some("The deathcore band OSIAH hit the road.")
        );
        assert_eq!(
            tour.image_url.as_deref(),
            Some("https://press.example/img/tour.jpg")
        );
    }

    #[test]
    fn test_malformed_unit_does_not_abort_feed() {
        let items = parse_feed(PRESS_RSS, "Metal Press", captured());
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["OSIAH announce UK tour", "Permalink only", "OSIAH in the news"]
        );
    }

    #[test]
    fn test_guid_fallback_and_unparsable_date_default() {
        let items = parse_feed(PRESS_RSS, "Metal Press", captured());
        assert_eq!(items[1].url, "https://press.example/p/42");
        assert_eq!(items[1].published_at, Some(captured()));
    }

    #[test]
    fn test_rss_source_element_sets_publisher() {
        let items = parse_feed(PRESS_RSS, "Google News", captured());
        let news = &items[2];
        assert_eq!(news.source_label, "Kerrang!");
        assert_eq!(news.publisher_url.as_deref(), Some("https://www.kerrang.com"));
        assert_eq!(items[0].source_label, "Google News");
        assert_eq!(items[0].publisher_url, None);
    }

    #[test]
    fn test_empty_and_garbage_input() {
        assert!(parse_feed("", "X", captured()).is_empty());
        assert!(parse_feed("<html><body>nope</body></html>", "X", captured()).is_empty());
    }

    #[test]
    fn test_long_excerpt_is_kept_whole() {
        let filler = "word ".repeat(80);
        let feed = format!(
            "<rss><channel><item><title>T</title><link>https://x.example/1</link><description>{filler} new deathcore single</description></item></channel></rss>"
        );
        let items = parse_feed(&feed, "X", captured());
        let excerpt = items[0].excerpt.as_deref().unwrap();
        assert!(excerpt.ends_with("new deathcore single"));
        assert!(excerpt.chars().count() > 400);
    }

    #[test]
    fn test_escaped_angle_brackets_survive_in_titles() {
        let feed = "<rss><channel><item><title>OSIAH &lt;3 fans &gt; everything</title><link>https://x.example/1</link><description>&lt;p&gt;Thanks&amp;nbsp;all&lt;/p&gt;</description></item></channel></rss>";
        let items = parse_feed(feed, "X", captured());
        assert_eq!(items[0].title, "OSIAH <3 fans > everything");
        assert_eq!(items[0].excerpt.as_deref(), Some("Thanks all"));
    }

    #[test]
    fn test_canonical_video_link() {
        assert_eq!(
            canonical_video_link("https://youtu.be/abc?si=tracking"),
            "https://www.youtube.com/watch?v=abc"
        );
        assert_eq!(
            canonical_video_link("https://m.youtube.com/shorts/xyz"),
            "https://www.youtube.com/watch?v=xyz"
        );
        assert_eq!(
            canonical_video_link("https://www.youtube.com/watch?v=abc"),
            "https://www.youtube.com/watch?v=abc"
        );
        assert_eq!(
            canonical_video_link("https://press.example/a"),
            "https://press.example/a"
        );
    }
}
