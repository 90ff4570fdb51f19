//! Pipeline configuration.
//!
//! Everything an operator may want to tune lives in [`Config`]: which sources
//! to poll, the relevance term lists, the trusted publication hosts, the
//! output location and the item cap. The struct is loaded from an optional
//! YAML file (every field has a default, so partial files are fine) and then
//! overridden by CLI flags / environment variables, see [`crate::cli::Cli`].
//!
//! # Example
//!
//! ```yaml
//! subject: OSIAH
//! youtube:
//!   channel_id: UCabc123
//!   include_uploads: true
//! bandcamp:
//!   subdomain: osiah
//!   mode: catalog
//! press_feeds:
//!   - label: Metal Injection
//!     url: https://metalinjection.net/feed
//! max_items: 30
//! output_path: data/news.json
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::models::{SourceKind, SourceSpec};

/// Top-level configuration threaded through [`crate::pipeline::run`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Name of the tracked subject; must appear as a whole word in filtered items.
    pub subject: String,
    /// Same-spelled unrelated names that veto an item when present as whole words.
    pub homographs: Vec<String>,
    /// Off-topic substrings that reject an item outright.
    pub block_terms: Vec<String>,
    /// Domain vocabulary that accepts an item once it passed the vetoes.
    pub context_terms: Vec<String>,
    /// Publication hosts whose items are accepted without a context term.
    pub trusted_hosts: Vec<String>,
    pub youtube: Option<YoutubeConfig>,
    pub bandcamp: Option<BandcampConfig>,
    pub press_feeds: Vec<PressFeed>,
    pub news_search: Option<NewsSearchConfig>,
    /// Canonical output file, overwritten in full on every run.
    pub output_path: PathBuf,
    /// Optional diagnostics snapshot; not a compatibility surface.
    pub diagnostics_path: Option<PathBuf>,
    /// Number of records kept after ranking.
    pub max_items: usize,
    pub fetch: FetchSettings,
    pub catalog: CatalogSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct YoutubeConfig {
    pub channel_id: String,
    /// Also poll the channel's uploads playlist (`UC...` -> `UU...`).
    pub include_uploads: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BandcampMode {
    /// `https://<subdomain>.bandcamp.com/feed`, parsed as syndication.
    Feed,
    /// `https://<subdomain>.bandcamp.com/music`, scraped as a catalog page.
    Catalog,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BandcampConfig {
    pub subdomain: String,
    pub mode: BandcampMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PressFeed {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsSearchConfig {
    pub label: String,
    /// Disambiguating terms OR-ed together after the quoted subject.
    pub terms: Vec<String>,
}

/// HTTP client knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
}

/// Catalog-page detail fetching knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// How many of the earliest-discovered tiles get a detail fetch for their date.
    pub detail_cap: usize,
    /// Delay step between consecutive detail fetches.
    pub stagger_ms: u64,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subject: "OSIAH".to_string(),
            homographs: strings(&["josiah"]),
            // Substring matched: short acronyms would hit inside ordinary words
            // ("nfl" in "influence"), so only full words and phrases belong here.
            block_terms: strings(&[
                "football", "soccer", "basketball", "baseball", "nfl draft", "nba finals",
                "touchdown", "quarterback", "arrested", "charged with", "lawsuit", "sentenced",
                "murder", "police", "in court", "court case", "scripture", "bible",
                "king josiah", "nigeria", "lagos", "ghana",
            ]),
            context_terms: strings(&[
                "deathcore", "metalcore", "metal", "hardcore", "band", "album", "single",
                "new song", "music video", "tour", "festival", "live", "setlist", "vinyl",
                "merch", "release", "track",
            ]),
            trusted_hosts: strings(&[
                "metalinjection.net",
                "distortedsoundmag.com",
                "ghostcultmag.com",
                "newnoisemagazine.com",
                "kerrang.com",
                "loudersound.com",
                "theprp.com",
                "blabbermouth.net",
                "metal-hammer.com",
                "wallofsoundau.com",
            ]),
            youtube: Some(YoutubeConfig::default()),
            bandcamp: Some(BandcampConfig::default()),
            press_feeds: vec![
                PressFeed {
                    label: "Metal Injection".to_string(),
                    url: "https://metalinjection.net/feed".to_string(),
                },
                PressFeed {
                    label: "Distorted Sound".to_string(),
                    url: "https://distortedsoundmag.com/feed/".to_string(),
                },
                PressFeed {
                    label: "Ghost Cult".to_string(),
                    url: "https://www.ghostcultmag.com/feed/".to_string(),
                },
                PressFeed {
                    label: "New Noise".to_string(),
                    url: "https://newnoisemagazine.com/feed/".to_string(),
                },
            ],
            news_search: Some(NewsSearchConfig::default()),
            output_path: PathBuf::from("data/news.json"),
            diagnostics_path: None,
            max_items: 30,
            fetch: FetchSettings::default(),
            catalog: CatalogSettings::default(),
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            channel_id: String::new(),
            include_uploads: true,
        }
    }
}

impl Default for BandcampConfig {
    fn default() -> Self {
        Self {
            subdomain: "osiah".to_string(),
            mode: BandcampMode::Catalog,
        }
    }
}

impl Default for NewsSearchConfig {
    fn default() -> Self {
        Self {
            label: "Google News".to_string(),
            terms: strings(&["band", "deathcore", "metal", "album"]),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("osiah-news/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 15,
            max_retries: 2,
            retry_base_delay_ms: 500,
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            detail_cap: 6,
            stagger_ms: 350,
        }
    }
}

impl Config {
    /// Load from a YAML file, or fall back to the built-in defaults when no
    /// path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            debug!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("reading config {}: {e}", path.display()))?;
        let config = Self::from_yaml(&raw)
            .map_err(|e| format!("parsing config {}: {e}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.subject.trim().is_empty() {
            return Err("subject must not be empty".into());
        }
        if self.max_items == 0 {
            return Err("max_items must be greater than zero".into());
        }
        if self.fetch.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be greater than zero".into());
        }
        if self.fetch.max_retries > 10 {
            return Err(format!(
                "fetch.max_retries {} is too large (max 10)",
                self.fetch.max_retries
            )
            .into());
        }
        if self.catalog.detail_cap > 50 {
            return Err(format!(
                "catalog.detail_cap {} is too large (max 50)",
                self.catalog.detail_cap
            )
            .into());
        }
        Ok(())
    }

    /// Expand the configured providers into concrete fetch targets, in the
    /// order their results take part in first-seen-wins deduplication.
    pub fn sources(&self) -> Vec<SourceSpec> {
        let mut out = Vec::new();

        if let Some(yt) = &self.youtube {
            let channel_id = yt.channel_id.trim();
            if !channel_id.is_empty() {
                out.push(SourceSpec {
                    label: "YouTube".to_string(),
                    kind: SourceKind::VideoChannel,
                    url: format!("https://www.youtube.com/feeds/videos.xml?channel_id={channel_id}"),
                });
                if yt.include_uploads {
                    match uploads_playlist_id(channel_id) {
                        Some(playlist) => out.push(SourceSpec {
                            label: "YouTube".to_string(),
                            kind: SourceKind::VideoChannel,
                            url: format!(
                                "https://www.youtube.com/feeds/videos.xml?playlist_id={playlist}"
                            ),
                        }),
                        None => debug!(%channel_id, "Channel id has no uploads playlist form"),
                    }
                }
            }
        }

        if let Some(bc) = &self.bandcamp {
            let sub = bc.subdomain.trim();
            if !sub.is_empty() {
                let (kind, path) = match bc.mode {
                    BandcampMode::Feed => (SourceKind::MarketplaceFeed, "feed"),
                    BandcampMode::Catalog => (SourceKind::MarketplaceCatalog, "music"),
                };
                out.push(SourceSpec {
                    label: "Bandcamp".to_string(),
                    kind,
                    url: format!("https://{sub}.bandcamp.com/{path}"),
                });
            }
        }

        for feed in &self.press_feeds {
            out.push(SourceSpec {
                label: feed.label.clone(),
                kind: SourceKind::Press,
                url: feed.url.clone(),
            });
        }

        if let Some(search) = &self.news_search {
            out.push(SourceSpec {
                label: search.label.clone(),
                kind: SourceKind::NewsSearch,
                url: news_search_url(&self.subject, &search.terms),
            });
        }

        out
    }
}

/// The uploads playlist of a channel shares its id with `UC` swapped for `UU`.
pub fn uploads_playlist_id(channel_id: &str) -> Option<String> {
    channel_id
        .strip_prefix("UC")
        .filter(|rest| !rest.is_empty())
        .map(|rest| format!("UU{rest}"))
}

/// Build the news-search RSS URL: the quoted subject AND any of `terms`.
pub fn news_search_url(subject: &str, terms: &[String]) -> String {
    let mut query = format!("\"{}\"", subject.trim());
    if !terms.is_empty() {
        query.push_str(&format!(" ({})", terms.join(" OR ")));
    }
    format!(
        "https://news.google.com/rss/search?q={}&hl=en-US&gl=US&ceid=US:en",
        urlencoding::encode(&query)
    )
}
