//! # OSIAH News
//!
//! A news harvester for a single band. It polls the band's video channel,
//! its marketplace page, a handful of curated metal press feeds and a news
//! search feed, keeps only what is actually about the band, and writes one
//! ranked JSON file for the website to read.
//!
//! ## Usage
//!
//! ```sh
//! osiah_news -c news.yaml -o data/news.json
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Download every configured source concurrently, with retry
//! 2. **Parsing**: Turn feeds and catalog pages into candidate items
//! 3. **Filtering**: Drop press and search items that are not about the band
//! 4. **Merging**: Deduplicate, rank newest first and truncate
//! 5. **Output**: Replace the JSON record file, plus an optional diagnostics snapshot
//!
//! A source that cannot be reached contributes nothing; only a failure to
//! write the output file ends the run with an error.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod extract;
mod fetcher;
mod merge;
mod models;
mod outputs;
mod pipeline;
mod relevance;
mod scrapers;
mod utils;

use cli::Cli;
use config::Config;
use fetcher::{HttpFetcher, RetryFetch};
use models::SourceStatus;
use outputs::json;
use relevance::RelevanceFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("osiah_news starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.output, ?args.diagnostics, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = Config::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e);
    }
    let relevance = RelevanceFilter::from_config(&config)?;

    let fetcher = RetryFetch::from_settings(HttpFetcher::new(&config.fetch)?, &config.fetch);
    debug!(?fetcher, "Fetcher ready");

    // ---- Harvest ----
    let captured_at = Utc::now();
    let harvest = pipeline::run(&fetcher, &config, &relevance, captured_at).await;

    let failed = harvest
        .diagnostics
        .sources
        .iter()
        .filter(|r| matches!(r.status, SourceStatus::Failed { .. }))
        .count();
    if failed > 0 {
        warn!(
            failed,
            total = harvest.diagnostics.sources.len(),
            "Some sources were unavailable this run"
        );
    }

    // ---- Output ----
    if let Err(e) = json::write_records(&harvest.records, &config.output_path).await {
        error!(path = %config.output_path.display(), error = %e, "Failed to write news records");
        if let Err(fallback) = json::write_records(&[], &config.output_path).await {
            warn!(error = %fallback, "Could not write empty fallback output either");
        }
        return Err(e);
    }

    if let Some(path) = &config.diagnostics_path {
        json::write_diagnostics(&harvest.diagnostics, path).await;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        records = harvest.records.len(),
        "Execution complete"
    );

    Ok(())
}
