//! YAML configuration.
//!
//! Every section has defaults, so an empty file (or no file at all) gives a
//! working setup. [`AppConfig::load`] validates before returning; a config
//! that fails validation never reaches the pipeline.
//!
//! ```yaml
//! dedup:
//!   similarity_threshold: 0.75
//!   threshold_floor: 0.65
//!   comparison_budget_ms: 2000
//! scoring:
//!   keyword_weights: { zimbabwe: 3.0, harare: 2.0, fuel: 1.5 }
//! aggregation:
//!   source_weights: { rss: 1.0, scraped: 1.0, social: 1.5 }
//!   duplicate_discount: 0.3
//! batch:
//!   partition_key: source_category
//!   max_parallel: 4
//! ```

use crate::analysis::lexicon::Lexicon;
use crate::analysis::scorer::{DEFAULT_SATURATION, default_keyword_weights};
use crate::batch::PartitionKey;
use crate::dedup::ResolverOptions;
use crate::dedup::resolver::DEFAULT_THRESHOLD_FLOOR;
use crate::dedup::similarity::DEFAULT_CONTENT_COMPARE_CHARS;
use crate::error::ConfigError;
use crate::ingest::fetch::FetchConfig;
use crate::ingest::rss::{FeedConfig, default_feeds};
use crate::ingest::sites::{SiteConfig, default_sites};
use crate::models::SourceType;
use crate::trends::AggregationParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Duplicate resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Links at or above this score count as duplicates in the trend summary.
    pub similarity_threshold: f64,
    /// Lowest score that produces a link at all.
    pub threshold_floor: f64,
    pub content_compare_chars: usize,
    pub same_topic_keyword_overlap: f64,
    pub same_topic_min_shared: usize,
    /// Time allowed for the comparisons of one partition before falling back
    /// to titles only. Unlimited when absent.
    pub comparison_budget_ms: Option<u64>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        let options = ResolverOptions::default();
        Self {
            similarity_threshold: 0.75,
            threshold_floor: DEFAULT_THRESHOLD_FLOOR,
            content_compare_chars: DEFAULT_CONTENT_COMPARE_CHARS,
            same_topic_keyword_overlap: options.same_topic_keyword_overlap,
            same_topic_min_shared: options.same_topic_min_shared,
            comparison_budget_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub keyword_weights: BTreeMap<String, f64>,
    /// Raw score that maps to full relevance.
    pub saturation: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_weights: default_keyword_weights(),
            saturation: DEFAULT_SATURATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub partition_key: PartitionKey,
    /// Concurrent partitions, and concurrent fetches when collecting.
    pub max_parallel: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            partition_key: PartitionKey::None,
            max_parallel: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dedup: DedupConfig,
    pub scoring: ScoringConfig,
    pub aggregation: AggregationParams,
    pub batch: BatchConfig,
    pub lexicon: Lexicon,
    pub fetch: FetchConfig,
    pub feeds: Vec<FeedConfig>,
    pub sites: Vec<SiteConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dedup: DedupConfig::default(),
            scoring: ScoringConfig::default(),
            aggregation: AggregationParams::default(),
            batch: BatchConfig::default(),
            lexicon: Lexicon::default(),
            fetch: FetchConfig::default(),
            feeds: default_feeds(),
            sites: default_sites(),
        }
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl AppConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&content, &path.display().to_string())?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse(yaml, "<inline>")
    }

    fn parse(yaml: &str, path: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = if yaml.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let dedup = &self.dedup;
        unit_interval("dedup.similarity_threshold", dedup.similarity_threshold)?;
        unit_interval("dedup.threshold_floor", dedup.threshold_floor)?;
        unit_interval("dedup.same_topic_keyword_overlap", dedup.same_topic_keyword_overlap)?;
        if dedup.threshold_floor > dedup.similarity_threshold {
            return Err(invalid(
                "dedup.threshold_floor",
                format!(
                    "{} is above similarity_threshold {}",
                    dedup.threshold_floor, dedup.similarity_threshold
                ),
            ));
        }
        if dedup.content_compare_chars == 0 {
            return Err(invalid("dedup.content_compare_chars", "must be positive"));
        }

        let saturation = self.scoring.saturation;
        if !(saturation.is_finite() && saturation > 0.0) {
            return Err(invalid("scoring.saturation", format!("must be positive, got {saturation}")));
        }
        if let Some((keyword, weight)) = self
            .scoring
            .keyword_weights
            .iter()
            .find(|(_, w)| !w.is_finite())
        {
            return Err(invalid(
                "scoring.keyword_weights",
                format!("`{keyword}` has weight {weight}"),
            ));
        }

        let aggregation = &self.aggregation;
        unit_interval("aggregation.duplicate_discount", aggregation.duplicate_discount)?;
        unit_interval("aggregation.min_relevance_score", aggregation.min_relevance_score)?;
        for source_type in SourceType::ALL {
            match aggregation.source_weights.get(&source_type) {
                None => return Err(ConfigError::MissingSourceWeight(source_type)),
                Some(w) if !(w.is_finite() && *w >= 0.0) => {
                    return Err(invalid(
                        "aggregation.source_weights",
                        format!("`{source_type}` has weight {w}"),
                    ));
                }
                Some(_) => {}
            }
        }

        if self.batch.max_parallel == 0 {
            return Err(invalid("batch.max_parallel", "must be at least 1"));
        }

        self.lexicon.validate()?;

        for feed in &self.feeds {
            url::Url::parse(&feed.url)
                .map_err(|e| invalid("feeds", format!("{}: bad url `{}`: {e}", feed.name, feed.url)))?;
        }
        for site in &self.sites {
            site.validate().map_err(|reason| invalid("sites", reason))?;
        }
        Ok(())
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            content_compare_chars: self.dedup.content_compare_chars,
            same_topic_keyword_overlap: self.dedup.same_topic_keyword_overlap,
            same_topic_min_shared: self.dedup.same_topic_min_shared,
            comparison_budget: self.dedup.comparison_budget_ms.map(Duration::from_millis),
        }
    }

    pub fn aggregation_params(&self) -> AggregationParams {
        AggregationParams {
            similarity_threshold: self.dedup.similarity_threshold,
            ..self.aggregation.clone()
        }
    }
}
