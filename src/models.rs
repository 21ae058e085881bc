//! Data models for normalized news items, duplicate links and trend summaries.
//!
//! This module defines the core data structures used throughout the crate:
//! - [`RawRecord`]: an item as handed over by a collector (RSS, site scraper, social capture)
//! - [`NormalizedItem`]: the canonical in-memory representation of one content item
//! - [`DuplicateLink`]: a directed link from a canonical item to a related item
//! - [`TrendSummary`]: the aggregated view of a window of items
//! - [`TimeRange`]: the explicit window passed to resolution and aggregation
//!
//! The enums serialize in `snake_case` so the JSON written for the report and
//! listing layers reads `"near_duplicate"`, `"social"`, `"politicians"` and so on.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Where an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// An entry of a polled RSS feed.
    Rss,
    /// An article scraped from a news site.
    Scraped,
    /// A captured social-media post.
    Social,
}

impl SourceType {
    /// Every source type, in reporting order.
    pub const ALL: [SourceType; 3] = [SourceType::Rss, SourceType::Scraped, SourceType::Social];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Rss => "rss",
            SourceType::Scraped => "scraped",
            SourceType::Social => "social",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lexicon-based polarity of an item.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a named entity matched against the curated dictionaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Politicians,
    Organizations,
    Locations,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 3] = [
        EntityCategory::Politicians,
        EntityCategory::Organizations,
        EntityCategory::Locations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Politicians => "politicians",
            EntityCategory::Organizations => "organizations",
            EntityCategory::Locations => "locations",
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matched entities, keyed by category. Values are canonical names.
pub type Entities = BTreeMap<EntityCategory, BTreeSet<String>>;

/// Engagement counters reported by a social platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    #[serde(default)]
    pub likes: f64,
    #[serde(default)]
    pub retweets: f64,
    #[serde(default)]
    pub comments: f64,
    #[serde(default)]
    pub shares: f64,
}

impl EngagementMetrics {
    pub fn total(&self) -> f64 {
        self.likes + self.retweets + self.comments + self.shares
    }
}

/// Engagement as delivered by a collector: either a single number or the
/// per-platform counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Engagement {
    Total(f64),
    Metrics(EngagementMetrics),
}

impl Engagement {
    pub fn total(&self) -> f64 {
        match self {
            Engagement::Total(n) => *n,
            Engagement::Metrics(m) => m.total(),
        }
    }
}

/// A raw record handed over by a collector.
///
/// Only `source_type` and `source_name` are required; every text field may be
/// missing or empty. Dates arrive as whatever string the source published and
/// are parsed on a best-effort basis during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Identifier assigned upstream, if any.
    #[serde(default)]
    pub id: Option<String>,
    pub source_type: SourceType,
    pub source_name: String,
    #[serde(default)]
    pub source_category: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// The title was made up by the collector rather than published.
    #[serde(default)]
    pub title_synthesized: bool,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Publication timestamp as published by the source.
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub engagement: Option<Engagement>,
}

impl RawRecord {
    /// A record with only its origin filled in; collectors set the rest.
    pub fn new(source_type: SourceType, source_name: impl Into<String>) -> Self {
        Self {
            id: None,
            source_type,
            source_name: source_name.into(),
            source_category: None,
            title: None,
            title_synthesized: false,
            content: None,
            url: None,
            author: None,
            published_at: None,
            engagement: None,
        }
    }
}

/// One content item from any source, after normalization.
///
/// Created once per ingested [`RawRecord`]. Annotation fills `entities`,
/// `keywords`, `sentiment` and `relevance_score`; after that the item is only
/// ever borrowed immutably by the resolver and the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub id: String,
    /// Position in the ingestion stream, used to break publication-time ties.
    pub ingestion_order: u64,
    pub source_type: SourceType,
    pub source_name: String,
    pub source_category: Option<String>,
    pub title: String,
    /// `title` carries no story information, only its origin.
    #[serde(default)]
    pub title_synthesized: bool,
    pub content: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub entities: Entities,
    pub keywords: BTreeSet<String>,
    pub sentiment: Sentiment,
    pub relevance_score: f64,
    /// Popularity signal; 0 when the source has none.
    pub engagement: f64,
}

impl NormalizedItem {
    /// A bare item with no annotations. Mostly useful to collectors and tests.
    pub fn new(
        id: impl Into<String>,
        ingestion_order: u64,
        source_type: SourceType,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            ingestion_order,
            source_type,
            source_name: source_name.into(),
            source_category: None,
            title: String::new(),
            title_synthesized: false,
            content: String::new(),
            url: None,
            author: None,
            published_at: None,
            entities: Entities::new(),
            keywords: BTreeSet::new(),
            sentiment: Sentiment::Neutral,
            relevance_score: 0.0,
            engagement: 0.0,
        }
    }

    /// Title and content joined for text analysis.
    pub fn text(&self) -> String {
        match (self.title.is_empty(), self.content.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.title.clone(),
            (true, false) => self.content.clone(),
            (false, false) => format!("{}\n{}", self.title, self.content),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }

    /// Entities of one category, empty if none matched.
    pub fn entities_of(&self, category: EntityCategory) -> impl Iterator<Item = &String> {
        self.entities.get(&category).into_iter().flatten()
    }

    /// Extract the site name (the label before the public suffix) from the item URL
    /// For example: "https://www.herald.co.zw/article" -> "herald"
    pub fn source_tag(&self) -> Option<String> {
        self.url.as_ref().and_then(|url| {
            let parsed = url::Url::parse(url).ok()?;
            let host = parsed.host_str()?;
            let parts: Vec<&str> = host.split('.').filter(|p| !p.is_empty()).collect();
            if parts.len() < 2 {
                return None;
            }
            // "herald.co.zw" -> "herald", "lite.cnn.com" -> "cnn"
            let second_level = parts[parts.len() - 2];
            if parts.len() >= 3 && matches!(second_level, "co" | "com" | "org" | "net" | "gov" | "ac")
            {
                Some(parts[parts.len() - 3].to_string())
            } else {
                Some(second_level.to_string())
            }
        })
    }
}

/// How close a related item is to its canonical item.
///
/// Variants are declared from the strongest to the weakest band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateType {
    Exact,
    NearDuplicate,
    SameStoryDifferentAngle,
    SameTopic,
}

impl DuplicateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateType::Exact => "exact",
            DuplicateType::NearDuplicate => "near_duplicate",
            DuplicateType::SameStoryDifferentAngle => "same_story_different_angle",
            DuplicateType::SameTopic => "same_topic",
        }
    }
}

impl fmt::Display for DuplicateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link from the earlier (canonical) item to a later related item.
///
/// The serialized field names are the ones the listing API exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateLink {
    #[serde(rename = "canonical_article_id")]
    pub canonical_id: String,
    #[serde(rename = "duplicate_article_id")]
    pub related_id: String,
    pub title_similarity: f64,
    pub content_similarity: f64,
    pub combined_similarity: f64,
    pub duplicate_type: DuplicateType,
    /// The comparison skipped content because the batch ran out of time.
    #[serde(default)]
    pub title_only: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub manual_review: bool,
}

impl DuplicateLink {
    /// Reviewer confirmed the link.
    pub fn verify(&mut self) {
        self.is_verified = true;
        self.manual_review = false;
    }

    /// Reviewer wants another look at the link.
    pub fn flag_for_review(&mut self) {
        self.manual_review = true;
    }

    /// Whether this link marks `related_id` as a copy of the canonical story
    /// rather than separate coverage of it.
    pub fn is_duplicate(&self, similarity_threshold: f64) -> bool {
        self.combined_similarity >= similarity_threshold
    }
}

/// Half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Returns `None` when `end` is before `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    /// The `days` days leading up to `end`, or `None` when the start would
    /// fall outside the representable range.
    pub fn last_days(end: DateTime<Utc>, days: u32) -> Option<Self> {
        let start = end.checked_sub_signed(Duration::try_days(i64::from(days))?)?;
        Some(Self { start, end })
    }

    /// One calendar day in UTC.
    pub fn day(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// A ranked term of a trend summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTerm {
    pub term: String,
    pub weighted_count: f64,
    /// Number of items mentioning the term, unweighted.
    pub mentions: u64,
    /// Most recent publication time among those items.
    pub last_seen: Option<DateTime<Utc>>,
}

/// Earliest and latest publication time covered by a summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

/// Aggregated trends over one window. Regenerable from the corpus at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub window: TimeRange,
    /// Items inside the window, before relevance filtering.
    pub total_items: u64,
    /// Items that contributed to the tallies.
    pub items_considered: u64,
    /// Items inside the window left out for low relevance (kept for audit).
    pub items_below_relevance: u64,
    /// Contributing items counted at the duplicate discount.
    pub duplicates_discounted: u64,
    pub top_keywords: Vec<RankedTerm>,
    pub top_entities: BTreeMap<EntityCategory, Vec<RankedTerm>>,
    pub sentiment_distribution: BTreeMap<Sentiment, u64>,
    pub weighted_sentiment_distribution: BTreeMap<Sentiment, f64>,
    pub source_distribution: BTreeMap<SourceType, u64>,
    pub date_range: Option<DateRange>,
}

impl TrendSummary {
    /// A summary with every count at zero.
    pub fn empty(window: TimeRange) -> Self {
        Self {
            window,
            total_items: 0,
            items_considered: 0,
            items_below_relevance: 0,
            duplicates_discounted: 0,
            top_keywords: Vec::new(),
            top_entities: EntityCategory::ALL
                .iter()
                .map(|c| (*c, Vec::new()))
                .collect(),
            sentiment_distribution: Sentiment::ALL.iter().map(|s| (*s, 0)).collect(),
            weighted_sentiment_distribution: Sentiment::ALL.iter().map(|s| (*s, 0.0)).collect(),
            source_distribution: SourceType::ALL.iter().map(|s| (*s, 0)).collect(),
            date_range: None,
        }
    }
}
