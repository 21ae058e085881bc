//! One processing cycle: normalize, annotate, resolve, aggregate.
//!
//! ```text
//! RawRecord ─▶ Ingestor ─▶ Extractor + RelevanceScorer ─▶ window
//!                                                           │
//!                 TrendSummary ◀─ aggregate ◀─ links ◀─ resolve_partitioned
//! ```
//!
//! Nothing here fails on bad data. Per-item problems, worker failures and
//! budget overruns are collected as [`Issue`]s and the run is flagged as
//! partial when any of them cut the resolution short.

use crate::analysis::{Extractor, RelevanceScorer};
use crate::batch::{BatchResolution, resolve_partitioned};
use crate::config::AppConfig;
use crate::dedup::{DuplicateCluster, Resolver, clusters};
use crate::error::{ConfigError, PipelineError};
use crate::ingest::fetch::fetcher;
use crate::ingest::rss::fetch_feeds;
use crate::ingest::sites::scrape_sites;
use crate::ingest::Ingestor;
use crate::models::{DuplicateLink, NormalizedItem, RawRecord, TimeRange, TrendSummary};
use crate::trends::aggregate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MalformedInput,
    ComparisonTimeout,
    Fetch,
    Worker,
    Other,
}

/// A recoverable problem met during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub item_id: Option<String>,
    pub kind: IssueKind,
    pub message: String,
}

impl From<&PipelineError> for Issue {
    fn from(e: &PipelineError) -> Self {
        let (item_id, kind) = match e {
            PipelineError::MalformedInput { item_id, .. } => {
                (Some(item_id.clone()), IssueKind::MalformedInput)
            }
            PipelineError::ComparisonTimeout { .. } => (None, IssueKind::ComparisonTimeout),
            PipelineError::Fetch { .. } => (None, IssueKind::Fetch),
            PipelineError::Worker { .. } => (None, IssueKind::Worker),
            _ => (None, IssueKind::Other),
        };
        Issue {
            item_id,
            kind,
            message: e.to_string(),
        }
    }
}

/// Everything one cycle produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    /// Every normalized and annotated item, inside the window or not.
    pub items: Vec<NormalizedItem>,
    pub links: Vec<DuplicateLink>,
    pub clusters: Vec<DuplicateCluster>,
    pub summary: TrendSummary,
    pub issues: Vec<Issue>,
    /// Resolution was cancelled, fell back to titles, or lost a worker.
    pub partial: bool,
}

pub struct Pipeline {
    config: AppConfig,
    extractor: Extractor,
    scorer: RelevanceScorer,
    resolver: Resolver,
}

impl Pipeline {
    /// Build the stages from a config, validating it first.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let extractor = Extractor::new(&config.lexicon);
        let scorer = RelevanceScorer::new(&config.scoring.keyword_weights, config.scoring.saturation);
        let resolver = Resolver::new(config.resolver_options());
        Ok(Self {
            config,
            extractor,
            scorer,
            resolver,
        })
    }

    /// Stop resolution between items once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.resolver = self.resolver.with_cancellation(flag);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Fill entities, keywords, sentiment and relevance of each item.
    pub fn annotate(&self, items: &mut [NormalizedItem]) {
        for item in items.iter_mut() {
            self.extractor.annotate(item);
            self.scorer.annotate(item);
        }
    }

    /// Poll the configured feeds and sites. Failed sources are returned next
    /// to whatever the others produced.
    #[instrument(level = "info", skip_all)]
    pub async fn collect(&self, max_articles_per_site: usize) -> (Vec<RawRecord>, Vec<PipelineError>) {
        let fetcher = match fetcher(&self.config.fetch) {
            Ok(f) => f,
            Err(e) => return (Vec::new(), vec![e]),
        };
        let parallel = self.config.batch.max_parallel;

        let (mut records, mut failures) = fetch_feeds(&fetcher, &self.config.feeds, parallel).await;
        let (mut scraped, mut scrape_failures) =
            scrape_sites(&fetcher, &self.config.sites, max_articles_per_site, parallel).await;
        records.append(&mut scraped);
        failures.append(&mut scrape_failures);

        info!(records = records.len(), failures = failures.len(), "Collected sources");
        (records, failures)
    }

    /// Normalize and process raw records.
    pub async fn run(&self, records: Vec<RawRecord>, window: TimeRange) -> PipelineRun {
        let (items, errors) = Ingestor::new().normalize_all(records);
        let mut run = self.run_items(items, window).await;
        let mut issues: Vec<Issue> = errors.iter().map(Issue::from).collect();
        issues.append(&mut run.issues);
        run.issues = issues;
        run
    }

    /// Process already normalized items. Items are re-annotated.
    #[instrument(level = "info", skip_all, fields(items = items.len(), start = %window.start, end = %window.end))]
    pub async fn run_items(&self, mut items: Vec<NormalizedItem>, window: TimeRange) -> PipelineRun {
        self.annotate(&mut items);

        let params = self.config.aggregation_params();
        let windowed: Vec<NormalizedItem> = items
            .iter()
            .filter(|item| match item.published_at {
                Some(ts) => window.contains(ts),
                None => params.include_undated,
            })
            .cloned()
            .collect();
        info!(in_window = windowed.len(), total = items.len(), "Selected window");

        let outcome = resolve_partitioned(
            &windowed,
            &self.resolver,
            self.config.dedup.threshold_floor,
            self.config.batch.partition_key,
            self.config.batch.max_parallel,
        )
        .await;
        let partial = outcome.is_partial();
        if partial {
            warn!(
                cancelled = outcome.cancelled,
                title_only = outcome.title_only_fallback,
                errors = outcome.errors.len(),
                "Run is partial"
            );
        }
        let BatchResolution { links, errors, .. } = outcome;

        let summary = aggregate(&windowed, &links, &params, &window);
        let clusters = clusters(&windowed, &links);

        PipelineRun {
            items,
            links,
            clusters,
            summary,
            issues: errors.iter().map(Issue::from).collect(),
            partial,
        }
    }
}
