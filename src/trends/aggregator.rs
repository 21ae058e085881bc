//! Cross-source trend aggregation over one time window.
//!
//! Every considered item adds its weight to each of its keywords, entities,
//! its sentiment and its source type:
//!
//! ```text
//! weight = source_weights[source_type] * (1 | duplicate_discount) * (1 + ln(1 + engagement))
//! ```
//!
//! Duplicates still count, at the discount, so a story carried by several
//! outlets reads as corroborated without being counted once per copy.

use crate::models::{
    DateRange, DuplicateLink, EntityCategory, NormalizedItem, RankedTerm, Sentiment, SourceType,
    TimeRange, TrendSummary,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, instrument};

/// The `aggregation` section of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationParams {
    pub source_weights: BTreeMap<SourceType, f64>,
    /// Weight fraction of an item that duplicates an earlier one.
    pub duplicate_discount: f64,
    /// Links at or above this combined score mark their related item as a
    /// duplicate. Taken from `dedup.similarity_threshold` when loaded from config.
    #[serde(skip)]
    pub similarity_threshold: f64,
    pub min_relevance_score: f64,
    /// Count items without a publication time as part of the window.
    pub include_undated: bool,
    pub top_keywords: usize,
    /// Per entity category.
    pub top_entities: usize,
}

pub fn default_source_weights() -> BTreeMap<SourceType, f64> {
    BTreeMap::from([
        (SourceType::Rss, 1.0),
        (SourceType::Scraped, 1.0),
        (SourceType::Social, 1.5),
    ])
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self {
            source_weights: default_source_weights(),
            duplicate_discount: 0.3,
            similarity_threshold: 0.75,
            min_relevance_score: 0.5,
            include_undated: false,
            top_keywords: 20,
            top_entities: 10,
        }
    }
}

impl AggregationParams {
    /// Weight of one item in every tally.
    pub fn item_weight(&self, item: &NormalizedItem, is_duplicate: bool) -> f64 {
        let source = self
            .source_weights
            .get(&item.source_type)
            .copied()
            .unwrap_or(1.0);
        let discount = if is_duplicate {
            self.duplicate_discount
        } else {
            1.0
        };
        source * discount * (1.0 + item.engagement.max(0.0).ln_1p())
    }

    fn in_window(&self, item: &NormalizedItem, window: &TimeRange) -> bool {
        match item.published_at {
            Some(ts) => window.contains(ts),
            None => self.include_undated,
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    weighted: f64,
    mentions: u64,
    last_seen: Option<DateTime<Utc>>,
}

impl Tally {
    fn add(&mut self, weight: f64, seen: Option<DateTime<Utc>>) {
        self.weighted += weight;
        self.mentions += 1;
        self.last_seen = self.last_seen.max(seen);
    }
}

/// Highest weighted count first, then most recently seen, then alphabetical.
fn rank(tallies: BTreeMap<String, Tally>, limit: usize) -> Vec<RankedTerm> {
    let mut ranked: Vec<RankedTerm> = tallies
        .into_iter()
        .map(|(term, t)| RankedTerm {
            term,
            weighted_count: t.weighted,
            mentions: t.mentions,
            last_seen: t.last_seen,
        })
        .collect();
    ranked.sort_by(compare_ranked);
    ranked.truncate(limit);
    ranked
}

fn compare_ranked(a: &RankedTerm, b: &RankedTerm) -> Ordering {
    b.weighted_count
        .total_cmp(&a.weighted_count)
        .then_with(|| b.last_seen.cmp(&a.last_seen))
        .then_with(|| a.term.cmp(&b.term))
}

/// Summarize `items` inside `window`. Inputs are only read, and the same
/// inputs always give the same summary.
#[instrument(level = "info", skip_all, fields(items = items.len(), links = links.len(), start = %window.start, end = %window.end))]
pub fn aggregate(
    items: &[NormalizedItem],
    links: &[DuplicateLink],
    params: &AggregationParams,
    window: &TimeRange,
) -> TrendSummary {
    let mut summary = TrendSummary::empty(*window);

    let duplicates: HashSet<&str> = links
        .iter()
        .filter(|l| l.is_duplicate(params.similarity_threshold))
        .map(|l| l.related_id.as_str())
        .collect();

    let mut keywords: BTreeMap<String, Tally> = BTreeMap::new();
    let mut entities: BTreeMap<EntityCategory, BTreeMap<String, Tally>> = BTreeMap::new();
    let mut earliest: Option<DateTime<Utc>> = None;
    let mut latest: Option<DateTime<Utc>> = None;

    for item in items.iter().filter(|i| params.in_window(i, window)) {
        summary.total_items += 1;
        if item.relevance_score < params.min_relevance_score {
            summary.items_below_relevance += 1;
            continue;
        }
        summary.items_considered += 1;

        let is_duplicate = duplicates.contains(item.id.as_str());
        if is_duplicate {
            summary.duplicates_discounted += 1;
        }
        let weight = params.item_weight(item, is_duplicate);
        let seen = item.published_at;

        for keyword in &item.keywords {
            keywords.entry(keyword.clone()).or_default().add(weight, seen);
        }
        for (category, names) in &item.entities {
            let per_category = entities.entry(*category).or_default();
            for name in names {
                per_category.entry(name.clone()).or_default().add(weight, seen);
            }
        }

        *summary.sentiment_distribution.entry(item.sentiment).or_insert(0) += 1;
        *summary
            .weighted_sentiment_distribution
            .entry(item.sentiment)
            .or_insert(0.0) += weight;
        *summary.source_distribution.entry(item.source_type).or_insert(0) += 1;

        if let Some(ts) = seen {
            earliest = Some(earliest.map_or(ts, |e| e.min(ts)));
            latest = Some(latest.map_or(ts, |l| l.max(ts)));
        }
    }

    summary.top_keywords = rank(keywords, params.top_keywords);
    for (category, tallies) in entities {
        summary
            .top_entities
            .insert(category, rank(tallies, params.top_entities));
    }
    summary.date_range = earliest
        .zip(latest)
        .map(|(earliest, latest)| DateRange { earliest, latest });

    info!(
        total = summary.total_items,
        considered = summary.items_considered,
        below_relevance = summary.items_below_relevance,
        discounted = summary.duplicates_discounted,
        keywords = summary.top_keywords.len(),
        "Aggregated trends"
    );
    summary
}

/// Share of each sentiment among the considered items, in percent.
pub fn sentiment_percentages(summary: &TrendSummary) -> BTreeMap<Sentiment, f64> {
    let total: u64 = summary.sentiment_distribution.values().sum();
    summary
        .sentiment_distribution
        .iter()
        .map(|(s, n)| {
            let pct = if total == 0 {
                0.0
            } else {
                *n as f64 * 100.0 / total as f64
            };
            (*s, pct)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DuplicateType;
    use chrono::TimeZone;

    fn window() -> TimeRange {
        TimeRange::day(Utc.with_ymd_and_hms(2025, 5, 6, 0, 0, 0).unwrap().date_naive())
    }

    fn item(id: &str, source_type: SourceType, hour: Option<u32>, keywords: &[&str]) -> NormalizedItem {
        let mut item = NormalizedItem::new(id, 0, source_type, "test");
        item.title = id.to_string();
        item.published_at = hour.map(|h| Utc.with_ymd_and_hms(2025, 5, 6, h, 0, 0).unwrap());
        item.keywords = keywords.iter().map(|k| k.to_string()).collect();
        item.relevance_score = 1.0;
        item
    }

    fn link(canonical: &str, related: &str, combined: f64) -> DuplicateLink {
        DuplicateLink {
            canonical_id: canonical.to_string(),
            related_id: related.to_string(),
            title_similarity: combined,
            content_similarity: combined,
            combined_similarity: combined,
            duplicate_type: crate::dedup::classify(combined),
            title_only: false,
            is_verified: false,
            manual_review: false,
        }
    }

    fn weight_of(summary: &TrendSummary, term: &str) -> f64 {
        summary
            .top_keywords
            .iter()
            .find(|t| t.term == term)
            .map(|t| t.weighted_count)
            .unwrap_or(0.0)
    }

    #[test]
    fn test_empty_input_gives_zero_summary() {
        let summary = aggregate(&[], &[], &AggregationParams::default(), &window());
        assert_eq!(summary, TrendSummary::empty(window()));
        assert_eq!(summary.total_items, 0);
        assert!(summary.date_range.is_none());
    }

    #[test]
    fn test_social_engagement_outweighs_plain_rss() {
        let mut social = item("social-1", SourceType::Social, Some(9), &["inflation"]);
        social.engagement = 1000.0;
        let rss = item("rss-1", SourceType::Rss, Some(9), &["drought"]);

        let summary = aggregate(&[social, rss], &[], &AggregationParams::default(), &window());
        let social_weight = weight_of(&summary, "inflation");
        let rss_weight = weight_of(&summary, "drought");
        assert!((rss_weight - 1.0).abs() < 1e-9);
        assert!((social_weight - 1.5 * (1.0 + 1001f64.ln())).abs() < 1e-9);
        assert!(social_weight > 10.0 * rss_weight);
        assert_eq!(summary.top_keywords[0].term, "inflation");
    }

    #[test]
    fn test_duplicates_count_at_discount() {
        let a = item("a", SourceType::Rss, Some(8), &["currency"]);
        let b = item("b", SourceType::Rss, Some(9), &["currency"]);
        let params = AggregationParams::default();

        let summary = aggregate(&[a.clone(), b.clone()], &[link("a", "b", 0.8)], &params, &window());
        assert!((weight_of(&summary, "currency") - 1.3).abs() < 1e-9);
        assert_eq!(summary.duplicates_discounted, 1);

        // below the similarity threshold the related item counts in full
        let summary = aggregate(&[a.clone(), b.clone()], &[link("a", "b", 0.7)], &params, &window());
        assert!((weight_of(&summary, "currency") - 2.0).abs() < 1e-9);
        assert_eq!(summary.duplicates_discounted, 0);

        assert!(params.item_weight(&b, true) < params.item_weight(&b, false));
    }

    #[test]
    fn test_window_and_undated_items() {
        let inside = item("in", SourceType::Rss, Some(10), &["inside"]);
        let mut outside = item("out", SourceType::Rss, None, &["outside"]);
        outside.published_at = Some(Utc.with_ymd_and_hms(2025, 5, 7, 0, 0, 0).unwrap());
        let undated = item("undated", SourceType::Scraped, None, &["undated"]);
        let items = vec![inside, outside, undated];

        let summary = aggregate(&items, &[], &AggregationParams::default(), &window());
        assert_eq!(summary.total_items, 1);
        assert_eq!(weight_of(&summary, "outside"), 0.0);
        assert_eq!(weight_of(&summary, "undated"), 0.0);

        let params = AggregationParams {
            include_undated: true,
            ..AggregationParams::default()
        };
        let summary = aggregate(&items, &[], &params, &window());
        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.source_distribution[&SourceType::Scraped], 1);
        let range = summary.date_range.unwrap();
        assert_eq!(range.earliest, range.latest);
    }

    #[test]
    fn test_low_relevance_items_are_reported_not_counted() {
        let mut weak = item("weak", SourceType::Rss, Some(8), &["weak"]);
        weak.relevance_score = 0.2;
        let strong = item("strong", SourceType::Rss, Some(9), &["strong"]);

        let summary = aggregate(&[weak, strong], &[], &AggregationParams::default(), &window());
        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.items_considered, 1);
        assert_eq!(summary.items_below_relevance, 1);
        assert_eq!(summary.top_keywords.len(), 1);
    }

    #[test]
    fn test_ranking_ties_prefer_recent_then_alphabetical() {
        let early = item("early", SourceType::Rss, Some(8), &["zeta"]);
        let late = item("late", SourceType::Rss, Some(12), &["omega", "alpha"]);

        let summary = aggregate(&[early, late], &[], &AggregationParams::default(), &window());
        let terms: Vec<&str> = summary.top_keywords.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["alpha", "omega", "zeta"]);
    }

    #[test]
    fn test_entities_and_sentiment_tallies() {
        let mut a = item("a", SourceType::Rss, Some(8), &[]);
        a.entities
            .entry(EntityCategory::Locations)
            .or_default()
            .insert("Harare".to_string());
        a.sentiment = Sentiment::Negative;
        let mut b = a.clone();
        b.id = "b".to_string();
        b.source_type = SourceType::Social;

        let summary = aggregate(&[a, b], &[], &AggregationParams::default(), &window());
        let harare = &summary.top_entities[&EntityCategory::Locations][0];
        assert_eq!(harare.term, "Harare");
        assert_eq!(harare.mentions, 2);
        assert!((harare.weighted_count - 2.5).abs() < 1e-9);
        assert!(summary.top_entities[&EntityCategory::Politicians].is_empty());
        assert_eq!(summary.sentiment_distribution[&Sentiment::Negative], 2);
        assert_eq!(summary.sentiment_distribution[&Sentiment::Positive], 0);

        let pct = sentiment_percentages(&summary);
        assert_eq!(pct[&Sentiment::Negative], 100.0);
    }

    #[test]
    fn test_idempotent() {
        let a = item("a", SourceType::Rss, Some(8), &["currency", "inflation"]);
        let b = item("b", SourceType::Social, Some(9), &["currency"]);
        let links = vec![link("a", "b", 0.96)];
        let params = AggregationParams::default();

        let first = aggregate(&[a.clone(), b.clone()], &links, &params, &window());
        let second = aggregate(&[a, b], &links, &params, &window());
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.top_keywords[0].term, "currency");
        assert_eq!(links[0].duplicate_type, DuplicateType::Exact);
    }
}
