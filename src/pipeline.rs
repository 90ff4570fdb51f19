//! Run orchestration: one task per source, joined all-settled, then merged.
//!
//! Every configured source becomes an independent future running
//! fetch → parse → filter. The futures are polled together with
//! [`join_all`] on the current task, so fetches overlap while no two stages
//! ever run in parallel and nothing needs a lock. A source that fails yields
//! a [`SourceStatus::Failed`] report and zero candidates; it cannot delay or
//! alter what the other sources contribute.
//!
//! Results are flattened in source-configuration order, which is what makes
//! the merger's first-seen-wins policy deterministic.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::fetcher::{Fetch, FetchError};
use crate::merge::merge;
use crate::models::{
    CandidateItem, Diagnostics, NewsRecord, SourceKind, SourceReport, SourceSpec, SourceStatus,
    iso_timestamp,
};
use crate::relevance::RelevanceFilter;
use crate::scrapers::{catalog, syndication};
use crate::utils::truncate_for_log;

/// How many output records the diagnostics snapshot carries.
const DIAGNOSTICS_SAMPLE: usize = 5;

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct Harvest {
    pub records: Vec<NewsRecord>,
    pub diagnostics: Diagnostics,
}

/// Candidates one source contributed.
#[derive(Debug)]
struct SourceHarvest {
    parsed: usize,
    kept: Vec<CandidateItem>,
}

/// Harvest every configured source and merge the results.
///
/// `captured_at` is the run's single notion of "now": it stamps undated feed
/// units and unknown catalog dates, and it is injected so fixture runs are
/// reproducible byte for byte.
#[instrument(level = "info", skip_all, fields(captured_at = %captured_at))]
pub async fn run<F: Fetch>(
    fetcher: &F,
    config: &Config,
    filter: &RelevanceFilter,
    captured_at: DateTime<Utc>,
) -> Harvest {
    let sources = config.sources();
    info!(count = sources.len(), "Harvesting sources");

    let outcomes = join_all(
        sources
            .iter()
            .map(|spec| harvest_source(fetcher, spec, config, filter, captured_at)),
    )
    .await;

    let mut reports = Vec::with_capacity(sources.len());
    let mut candidates = Vec::new();
    for (spec, outcome) in sources.into_iter().zip(outcomes) {
        let (status, parsed, kept) = match outcome {
            Ok(harvest) => {
                info!(
                    source = %spec.label,
                    url = %spec.url,
                    parsed = harvest.parsed,
                    kept = harvest.kept.len(),
                    "Source harvested"
                );
                let kept = harvest.kept.len();
                candidates.extend(harvest.kept);
                (SourceStatus::Ok, harvest.parsed, kept)
            }
            Err(e) => {
                warn!(source = %spec.label, url = %spec.url, error = %e, "Source unavailable this run");
                (
                    SourceStatus::Failed {
                        error: e.to_string(),
                    },
                    0,
                    0,
                )
            }
        };
        reports.push(SourceReport {
            label: spec.label,
            kind: spec.kind,
            url: spec.url,
            status,
            parsed,
            kept,
        });
    }

    let merged = merge(candidates, config.max_items, captured_at);
    info!(
        unique = merged.unique,
        output = merged.records.len(),
        "Merged candidates"
    );

    let diagnostics = Diagnostics {
        captured_at: iso_timestamp(captured_at),
        sources: reports,
        merged: merged.unique,
        output: merged.records.len(),
        sample: merged
            .records
            .iter()
            .take(DIAGNOSTICS_SAMPLE)
            .cloned()
            .collect(),
    };

    Harvest {
        records: merged.records,
        diagnostics,
    }
}

/// Fetch, parse and filter a single source.
async fn harvest_source<F: Fetch>(
    fetcher: &F,
    spec: &SourceSpec,
    config: &Config,
    filter: &RelevanceFilter,
    captured_at: DateTime<Utc>,
) -> Result<SourceHarvest, FetchError> {
    let body = fetcher.fetch(&spec.url).await?;

    let items = match spec.kind {
        SourceKind::MarketplaceCatalog => match Url::parse(&spec.url) {
            Ok(origin) => {
                catalog::harvest_catalog(fetcher, &body, &origin, &spec.label, &config.catalog)
                    .await
            }
            Err(e) => {
                warn!(source = %spec.label, url = %spec.url, error = %e, "Catalog URL does not parse");
                Vec::new()
            }
        },
        _ => syndication::parse_feed(&body, &spec.label, captured_at),
    };
    if items.is_empty() && !body.trim().is_empty() {
        debug!(source = %spec.label, preview = %truncate_for_log(&body, 200), "Source yielded no items");
    }

    let parsed = items.len();
    let kept = if spec.kind.is_trusted() {
        items
    } else {
        items
            .into_iter()
            .filter(|item| {
                let verdict = filter.evaluate(item);
                debug!(source = %spec.label, title = %item.title, %verdict, "Relevance");
                verdict.is_accepted()
            })
            .collect()
    };

    Ok(SourceHarvest { parsed, kept })
}
