//! Marketplace catalog-page scraper.
//!
//! Used when the marketplace offers no feed: the artist's `/music` page is a
//! grid of anchor tiles, one per release, linking to `/album/<slug>` or
//! `/track/<slug>`.
//!
//! # Dates
//!
//! The listing itself carries no dates, so the first `detail_cap` tiles (in
//! discovery order) are fetched again and searched for a `datePublished`
//! marker, either `<meta itemprop="datePublished">` or the JSON-LD key.
//! Detail fetch `i` waits `i * stagger` before going out so the origin never
//! sees a burst. Tiles past the cap and failed detail fetches keep an unknown
//! date; the merger ranks those after every dated item.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::CatalogSettings;
use crate::fetcher::{Fetch, fetch_or_empty};
use crate::models::CandidateItem;
use crate::utils::parse_timestamp;

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static DATE_META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[itemprop="datePublished"]"#).unwrap());
static RELEASE_PATH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/(?:album|track)/[^/]+").unwrap());
static JSON_LD_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""datePublished"\s*:\s*"([^"]+)""#).unwrap());

/// One release tile found on a catalog page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTile {
    pub title: String,
    pub url: String,
    pub image_url: Option<String>,
}

/// Scan a catalog page for release tiles, in document order.
///
/// Anchors are kept when their resolved path starts with `/album/` or
/// `/track/` and their visible text is non-empty. Repeated `(title, url)`
/// pairs (grid plus featured block, for example) are reported once.
pub fn scan_tiles(html: &str, origin: &Url) -> Vec<CatalogTile> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut tiles = Vec::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = origin.join(href.trim()) else {
            continue;
        };
        if !RELEASE_PATH_RE.is_match(resolved.path()) {
            continue;
        }

        let title = element.text().collect::<Vec<_>>().join(" ");
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        if title.is_empty() {
            continue;
        }

        let url = resolved.to_string();
        if !seen.insert((title.clone(), url.clone())) {
            continue;
        }

        let image_url = element.select(&IMG_SELECTOR).next().and_then(|img| {
            let attr = img
                .value()
                .attr("data-original")
                .or_else(|| img.value().attr("src"))?;
            origin.join(attr.trim()).ok().map(|u| u.to_string())
        });

        tiles.push(CatalogTile {
            title,
            url,
            image_url,
        });
    }

    tiles
}

/// Find the machine-readable publication date on a release detail page.
pub fn extract_date_published(html: &str) -> Option<DateTime<Utc>> {
    if html.is_empty() {
        return None;
    }

    let from_meta = {
        let document = Html::parse_document(html);
        document
            .select(&DATE_META_SELECTOR)
            .filter_map(|m| m.value().attr("content"))
            .find_map(parse_timestamp)
    };

    from_meta.or_else(|| {
        JSON_LD_DATE_RE
            .captures_iter(html)
            .find_map(|c| parse_timestamp(&c[1]))
    })
}

/// Turn a catalog page into candidates, recovering dates for the first
/// `settings.detail_cap` tiles.
///
/// # Arguments
///
/// * `fetcher` - Used for the per-tile detail fetches
/// * `html` - The listing page body
/// * `origin` - Base URL the tile hrefs resolve against
/// * `source_label` - Label stamped on every candidate
/// * `settings` - Detail-fetch cap and stagger step
#[instrument(level = "info", skip_all, fields(%origin, %source_label))]
pub async fn harvest_catalog<F: Fetch>(
    fetcher: &F,
    html: &str,
    origin: &Url,
    source_label: &str,
    settings: &CatalogSettings,
) -> Vec<CandidateItem> {
    let tiles = scan_tiles(html, origin);
    let cap = settings.detail_cap.min(tiles.len());
    let stagger = Duration::from_millis(settings.stagger_ms);

    let dates: Vec<Option<DateTime<Utc>>> =
        join_all(tiles.iter().take(cap).enumerate().map(|(i, tile)| async move {
            let delay = stagger.saturating_mul(i as u32);
            if !delay.is_zero() {
                sleep(delay).await;
            }
            let body = fetch_or_empty(fetcher, source_label, &tile.url).await;
            let date = extract_date_published(&body);
            if date.is_none() {
                debug!(url = %tile.url, "No publication date recovered");
            }
            date
        }))
        .await;

    let dated = dates.iter().filter(|d| d.is_some()).count();
    info!(
        tiles = tiles.len(),
        detail_fetches = cap,
        dated,
        "Scanned catalog page"
    );

    tiles
        .into_iter()
        .enumerate()
        .map(|(i, tile)| CandidateItem {
            title: tile.title,
            url: tile.url,
            published_at: dates.get(i).copied().flatten(),
            excerpt: None,
            image_url: tile.image_url,
            source_label: source_label.to_string(),
            publisher_url: None,
        })
        .collect()
}
