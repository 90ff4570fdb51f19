//! Command-line interface definitions for OSIAH News.
//!
//! Every option can also be supplied through an environment variable, which
//! is how the scheduled job passes them. Values given here override the
//! matching fields of the YAML configuration.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{BandcampConfig, Config, YoutubeConfig};

/// Command-line arguments for the OSIAH News aggregator.
///
/// # Examples
///
/// ```sh
/// # Defaults: built-in sources, writes data/news.json
/// osiah_news
///
/// # Custom config and output, with a diagnostics snapshot
/// osiah_news -c news.yaml -o public/data/news.json -d data/news.diagnostics.json
///
/// # Enable the video channel from the environment
/// NEWS_YOUTUBE_CHANNEL_ID=UCabc123 osiah_news -n 24
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "NEWS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output file for the ranked news records
    #[arg(short, long, env = "NEWS_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output file for the per-source diagnostics snapshot
    #[arg(short, long, env = "NEWS_DIAGNOSTICS")]
    pub diagnostics: Option<PathBuf>,

    /// Video channel id (`UC...`) to poll
    #[arg(long = "channel-id", env = "NEWS_YOUTUBE_CHANNEL_ID")]
    pub youtube_channel_id: Option<String>,

    /// Marketplace artist subdomain
    #[arg(long = "subdomain", env = "NEWS_BANDCAMP_SUBDOMAIN")]
    pub bandcamp_subdomain: Option<String>,

    /// Number of records to keep after ranking
    #[arg(short = 'n', long, env = "NEWS_MAX_ITEMS")]
    pub max_items: Option<usize>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(path) = &self.output {
            config.output_path = path.clone();
        }
        if let Some(path) = &self.diagnostics {
            config.diagnostics_path = Some(path.clone());
        }
        if let Some(channel_id) = &self.youtube_channel_id {
            config
                .youtube
                .get_or_insert_with(YoutubeConfig::default)
                .channel_id = channel_id.clone();
        }
        if let Some(subdomain) = &self.bandcamp_subdomain {
            config
                .bandcamp
                .get_or_insert_with(BandcampConfig::default)
                .subdomain = subdomain.clone();
        }
        if let Some(max_items) = self.max_items {
            config.max_items = max_items;
        }
    }
}
